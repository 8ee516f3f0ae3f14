// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Storage Modul for the locator
//!
//! Provides the [`PositionStore`] interface and its implementations. A store is
//! an append only, time indexed log of positions. It never updates, reorders or
//! deduplicates records.

use async_trait::async_trait;
use common::position::Position;
use thiserror::Error;

mod filesystem;
mod influx;
mod memory;

pub use filesystem::FileSystemStore;
pub use influx::{InfluxConfig, InfluxStore, Precision};
pub use memory::MemoryStore;

/// Errors reported by a [`PositionStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store can't be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backing store refused the record.
    #[error("Store rejected write: {0}")]
    WriteRejected(String),

    /// Reading from the backing store failed or timed out.
    #[error("Store query failed: {0}")]
    QueryFailed(String),
}

/// Append only persistence of positions.
///
/// Implementations must be safe to share between the ingestion worker and the
/// query side. Every write is independent: a failed write never blocks or
/// corrupts later writes.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Appends one position.
    async fn write(&self, position: &Position) -> Result<(), StoreError>;

    /// Returns at most `n` positions ordered by timestamp descending.
    ///
    /// If fewer than `n` positions are stored all of them are returned.
    /// Positions with equal timestamps are returned latest written first.
    async fn read_recent(&self, n: usize) -> Result<Vec<Position>, StoreError>;
}

/// Inserts `position` into an ascending slice behind every position with an
/// equal timestamp.
pub(crate) fn insert_ordered(ascending: &mut Vec<Position>, position: Position) {
    let index = ascending.partition_point(|p| p.timestamp() <= position.timestamp());
    ascending.insert(index, position);
}

/// Selects the newest `n` positions of an ascending, write ordered slice.
pub(crate) fn newest_first(ascending: &[Position], n: usize) -> Vec<Position> {
    ascending.iter().rev().take(n).copied().collect()
}
