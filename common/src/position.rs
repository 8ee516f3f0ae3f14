// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reported position of the tracking client.
///
/// The struct stores a point on Earth in decimal degrees together with the
/// absolute instant the report was received. Positions are immutable once
/// created; all fields are only reachable through accessors.
///
/// "No position" is never expressed as `(0.0, 0.0)`. Callers that may not
/// have a position use `Option<Position>`.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use common::position::Position;
///
/// let pos = Position::new(48.68, 11.29, Utc::now());
/// assert_eq!(pos.latitude(), 48.68);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl Position {
    /// Creates a new [`Position`].
    ///
    /// # Arguments
    ///
    /// * `latitude` – Latitude in decimal degrees. Positive for northern hemisphere.
    /// * `longitude` – Longitude in decimal degrees. Positive for eastern hemisphere.
    /// * `timestamp` – The instant the position was received.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Position {
            latitude,
            longitude,
            timestamp,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the instant the position was received.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
