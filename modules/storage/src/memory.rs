// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{PositionStore, StoreError, insert_ordered, newest_first};
use async_trait::async_trait;
use common::position::Position;
use std::sync::RwLock;
use tracing::debug;

/// A process local store that keeps every position in memory.
///
/// Replaces the old single "last position" cell: the latest position is a
/// query over the stored history. The content is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    // ascending by timestamp, ties in write order
    positions: RwLock<Vec<Position>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.positions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn write(&self, position: &Position) -> Result<(), StoreError> {
        let mut positions = self.positions.write().unwrap_or_else(|e| e.into_inner());
        insert_ordered(&mut positions, *position);
        debug!(
            "Stored position lat: {}, lon: {} in memory ({} positions)",
            position.latitude(),
            position.longitude(),
            positions.len()
        );
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<Position>, StoreError> {
        let positions = self.positions.read().unwrap_or_else(|e| e.into_inner());
        Ok(newest_first(&positions, n))
    }
}
