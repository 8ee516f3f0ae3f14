// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::position::Position;
use std::fmt;

/// Identifier of a single ingestion task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of an ingestion task.
///
/// ```text
/// Submitted -> Running -> Stored
///                      -> StoreFailed
///                      -> ParseFailed
/// Submitted -> Dropped            (queue full or closed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Running,
    Stored,
    ParseFailed,
    StoreFailed,
    Dropped,
}

/// Outcome of an ingestion task once it reached a terminal [`TaskState`].
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub task: TaskId,
    pub state: TaskState,
    /// The parsed position, present for `Stored` and `StoreFailed`.
    pub position: Option<Position>,
}
