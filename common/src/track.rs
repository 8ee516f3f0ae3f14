// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::position::Position;
use chrono::{DateTime, Utc};
use geo_types::Point;
use gpx::{Gpx, GpxVersion, TrackSegment};
use std::io::Write;
use thiserror::Error;

const GPX_CREATOR: &str = "locator";
const TRACK_NAME: &str = "locator";

/// A single point of a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time: Option<DateTime<Utc>>,
}

impl From<&Position> for Waypoint {
    fn from(position: &Position) -> Self {
        Waypoint {
            latitude: position.latitude(),
            longitude: position.longitude(),
            time: Some(position.timestamp()),
        }
    }
}

impl From<Position> for Waypoint {
    fn from(position: Position) -> Self {
        Waypoint::from(&position)
    }
}

/// Errors raised while exporting a [`Track`].
#[derive(Debug, Error)]
pub enum TrackExportError {
    #[error("Failed to write GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("GPX document is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// An ordered list of waypoints.
///
/// A track is a view over stored positions. It is rebuilt for every query and
/// never persisted. The waypoint order is the order of the positions the
/// track was built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub waypoints: Vec<Waypoint>,
}

impl Track {
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Converts the track into a GPX 1.1 document.
    ///
    /// The document holds exactly one track with exactly one segment, also
    /// when the track has no waypoints.
    pub fn to_gpx(&self) -> Gpx {
        let points = self.waypoints.iter().map(gpx_waypoint).collect();
        let mut track = gpx::Track::new();
        track.name = Some(TRACK_NAME.to_string());
        track.segments.push(TrackSegment { points });
        Gpx {
            version: GpxVersion::Gpx11,
            creator: Some(GPX_CREATOR.to_string()),
            tracks: vec![track],
            ..Default::default()
        }
    }

    /// Writes the GPX document of the track into `writer`.
    pub fn write_gpx<W: Write>(&self, writer: W) -> Result<(), TrackExportError> {
        gpx::write(&self.to_gpx(), writer)?;
        Ok(())
    }

    pub fn to_gpx_string(&self) -> Result<String, TrackExportError> {
        let mut buffer = Vec::new();
        self.write_gpx(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Assembles positions into a [`Track`].
///
/// The builder keeps the order of its input. Callers decide the order they
/// want, ascending for a travel path or descending for "most recent first".
/// Nothing is smoothed, simplified or deduplicated.
pub struct TrackBuilder;

impl TrackBuilder {
    pub fn build<I>(points: I) -> Track
    where
        I: IntoIterator<Item = Position>,
    {
        Track {
            waypoints: points.into_iter().map(Waypoint::from).collect(),
        }
    }
}

fn gpx_waypoint(waypoint: &Waypoint) -> gpx::Waypoint {
    // geo-types points are (x = longitude, y = latitude)
    let mut point = gpx::Waypoint::new(Point::new(waypoint.longitude, waypoint.latitude));
    point.time = waypoint.time.and_then(gpx_time);
    point
}

fn gpx_time(time: DateTime<Utc>) -> Option<gpx::Time> {
    let nanos = time.timestamp_nanos_opt()?;
    time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(nanos))
        .ok()
        .map(gpx::Time::from)
}
