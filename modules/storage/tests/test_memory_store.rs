// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{Duration, TimeZone, Utc};
use common::position::Position;
use storage::{MemoryStore, PositionStore};

fn get_positions(count: i64) -> Vec<Position> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    (0..count)
        .map(|i| {
            Position::new(
                48.68 + 0.001 * i as f64,
                11.29 + 0.001 * i as f64,
                start + Duration::seconds(i),
            )
        })
        .collect()
}

#[tokio::test]
#[test_log::test]
pub async fn read_recent_on_empty_store() {
    let store = MemoryStore::new();
    let positions = store.read_recent(10).await.unwrap();
    assert!(positions.is_empty());
}

#[tokio::test]
#[test_log::test]
pub async fn read_recent_returns_all_when_less_than_n() {
    let store = MemoryStore::new();
    let written = get_positions(3);
    for pos in written.iter() {
        store.write(pos).await.unwrap();
    }

    let positions = store.read_recent(10).await.unwrap();
    let expected: Vec<Position> = written.into_iter().rev().collect();
    assert_eq!(positions, expected);
}

#[tokio::test]
#[test_log::test]
pub async fn read_recent_limits_to_newest_n() {
    let store = MemoryStore::new();
    let written = get_positions(5);
    for pos in written.iter() {
        store.write(pos).await.unwrap();
    }

    let positions = store.read_recent(2).await.unwrap();
    assert_eq!(positions, vec![written[4], written[3]]);
    assert!(store.read_recent(0).await.unwrap().is_empty());
}

#[tokio::test]
#[test_log::test]
pub async fn read_recent_orders_by_time_not_write_order() {
    let store = MemoryStore::new();
    let written = get_positions(3);
    store.write(&written[2]).await.unwrap();
    store.write(&written[0]).await.unwrap();
    store.write(&written[1]).await.unwrap();

    let positions = store.read_recent(3).await.unwrap();
    assert_eq!(positions, vec![written[2], written[1], written[0]]);
}

#[tokio::test]
#[test_log::test]
pub async fn write_keeps_duplicates() {
    let store = MemoryStore::new();
    let pos = get_positions(1)[0];
    store.write(&pos).await.unwrap();
    store.write(&pos).await.unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.read_recent(5).await.unwrap(), vec![pos, pos]);
}

#[tokio::test]
#[test_log::test]
pub async fn equal_timestamps_return_latest_write_first() {
    let store = MemoryStore::new();
    let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let first = Position::new(1.0, 1.0, time);
    let second = Position::new(2.0, 2.0, time);
    store.write(&first).await.unwrap();
    store.write(&second).await.unwrap();

    assert_eq!(store.read_recent(2).await.unwrap(), vec![second, first]);
}
