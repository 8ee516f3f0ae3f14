// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use chrono::{Duration as TimeDelta, TimeZone, Utc};
use common::position::Position;
use query::{DEFAULT_QUERY_TIMEOUT, QueryService};
use std::{sync::Arc, time::Duration};
use storage::{MemoryStore, PositionStore, StoreError};

fn get_positions(count: i64) -> Vec<Position> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| Position::new(48.0 + i as f64, 11.0 + i as f64, start + TimeDelta::seconds(i)))
        .collect()
}

async fn create_service(positions: &[Position]) -> QueryService {
    let store = Arc::new(MemoryStore::new());
    for pos in positions {
        store.write(pos).await.unwrap();
    }
    QueryService::new(store, DEFAULT_QUERY_TIMEOUT)
}

struct HangingStore;

#[async_trait]
impl PositionStore for HangingStore {
    async fn write(&self, _position: &Position) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read_recent(&self, _n: usize) -> Result<Vec<Position>, StoreError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![])
    }
}

struct BrokenStore;

#[async_trait]
impl PositionStore for BrokenStore {
    async fn write(&self, _position: &Position) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    async fn read_recent(&self, _n: usize) -> Result<Vec<Position>, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }
}

#[tokio::test]
#[test_log::test]
async fn latest_on_empty_store_is_none() {
    let service = create_service(&[]).await;
    assert_eq!(service.latest().await, Ok(None));
}

#[tokio::test]
#[test_log::test]
async fn latest_returns_newest_position() {
    let positions = get_positions(3);
    let service = create_service(&positions).await;
    assert_eq!(service.latest().await, Ok(Some(positions[2])));
}

#[tokio::test]
#[test_log::test]
async fn track_is_chronological() {
    let positions = get_positions(5);
    let service = create_service(&positions).await;

    let track = service.track(3).await;
    assert_eq!(track.len(), 3);
    let times: Vec<_> = track.waypoints.iter().map(|w| w.time.unwrap()).collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(track.waypoints[0].latitude, positions[2].latitude());
    assert_eq!(track.waypoints[2].latitude, positions[4].latitude());
}

#[tokio::test]
#[test_log::test]
async fn track_of_empty_store_is_empty() {
    let service = create_service(&[]).await;
    let track = service.track(10).await;
    assert!(track.is_empty());
    assert!(track.to_gpx_string().is_ok());
}

#[tokio::test]
#[test_log::test]
async fn hanging_store_times_out() {
    let service = QueryService::new(Arc::new(HangingStore), Duration::from_millis(50));
    assert!(matches!(
        service.latest().await,
        Err(StoreError::QueryFailed(_))
    ));
    assert!(service.track(10).await.is_empty());
}

#[tokio::test]
#[test_log::test]
async fn store_errors_become_query_failed() {
    let service = QueryService::new(Arc::new(BrokenStore), DEFAULT_QUERY_TIMEOUT);
    assert!(matches!(
        service.latest().await,
        Err(StoreError::QueryFailed(_))
    ));
}
