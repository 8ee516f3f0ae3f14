// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Read side of the locator.
//!
//! Answers "where is the tracker now" and "where has it been" from the stored
//! position history.

use common::{
    position::Position,
    track::{Track, TrackBuilder},
};
use std::{sync::Arc, time::Duration};
use storage::{PositionStore, StoreError};
use tokio::time::timeout;
use tracing::{debug, error};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn PositionStore>,
    timeout: Duration,
}

impl QueryService {
    pub fn new(store: Arc<dyn PositionStore>, timeout: Duration) -> Self {
        QueryService { store, timeout }
    }

    /// Returns the most recent position, `None` if nothing was stored yet.
    ///
    /// A read that fails or exceeds the query timeout yields
    /// [`StoreError::QueryFailed`].
    pub async fn latest(&self) -> Result<Option<Position>, StoreError> {
        let positions = self.read_recent(1).await?;
        Ok(positions.into_iter().next())
    }

    /// Builds a track of the up to `n` most recent positions, oldest first.
    ///
    /// A failed read is logged and yields an empty track.
    pub async fn track(&self, n: usize) -> Track {
        match self.read_recent(n).await {
            Ok(mut positions) => {
                positions.reverse();
                debug!("Building track of {} position(s)", positions.len());
                TrackBuilder::build(positions)
            }
            Err(e) => {
                error!("Failed to read positions for track. Error: {}", e);
                Track::default()
            }
        }
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<Position>, StoreError> {
        match timeout(self.timeout, self.store.read_recent(n)).await {
            Ok(Ok(positions)) => Ok(positions),
            Ok(Err(StoreError::QueryFailed(e))) => Err(StoreError::QueryFailed(e)),
            Ok(Err(e)) => Err(StoreError::QueryFailed(e.to_string())),
            Err(_) => Err(StoreError::QueryFailed(format!(
                "no answer within {} ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
