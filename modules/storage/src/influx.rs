// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{PositionStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::position::Position;
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Duration};
use tracing::{debug, error, info};

const LATITUDE_FIELD: &str = "lat";
const LONGITUDE_FIELD: &str = "lon";
const TIME_COLUMN: &str = "time";

/// Timestamp precision used for writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    /// The value of the `precision` query parameter of the write endpoint.
    pub fn as_param(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }

    fn scale(&self, time: &DateTime<Utc>) -> i64 {
        match self {
            Precision::Nanoseconds => time
                .timestamp_nanos_opt()
                .unwrap_or_else(|| time.timestamp_micros().saturating_mul(1000)),
            Precision::Microseconds => time.timestamp_micros(),
            Precision::Milliseconds => time.timestamp_millis(),
            Precision::Seconds => time.timestamp(),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" | "n" => Ok(Precision::Nanoseconds),
            "u" | "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            other => Err(format!("unknown precision \"{other}\"")),
        }
    }
}

/// Connection settings of an InfluxDB 1.x compatible server.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub url: String,
    pub database: String,
    pub measurement: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub precision: Precision,
    /// Timeout of a single HTTP request.
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        InfluxConfig {
            url: "http://localhost:8086".to_string(),
            database: "locator".to_string(),
            measurement: "position".to_string(),
            username: None,
            password: None,
            precision: Precision::default(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Position store backed by an InfluxDB time series database.
///
/// Uses the HTTP API of InfluxDB 1.x (`/write` and `/query`). The underlying
/// [`reqwest::Client`] keeps a connection pool, so concurrent writes don't
/// reconnect and one failed write does not affect the next one.
///
/// Points with the same timestamp overwrite each other in InfluxDB. Coarse
/// precisions therefore lose reports that arrive within the same time unit.
pub struct InfluxStore {
    client: reqwest::Client,
    config: InfluxConfig,
}

impl InfluxStore {
    pub fn new(config: InfluxConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!(
            "Using InfluxDB {} database {} measurement {} precision {}",
            config.url, config.database, config.measurement, config.precision
        );
        Ok(InfluxStore { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_ref()),
            None => request,
        }
    }
}

#[async_trait]
impl PositionStore for InfluxStore {
    async fn write(&self, position: &Position) -> Result<(), StoreError> {
        let line = line_protocol(&self.config.measurement, position, self.config.precision);
        let request = self
            .client
            .post(self.endpoint("write"))
            .query(&[
                ("db", self.config.database.as_str()),
                ("precision", self.config.precision.as_param()),
            ])
            .body(line.clone());
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::WriteRejected(format!("{status}: {body}")));
        }
        debug!("Wrote \"{}\" to InfluxDB", line);
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<Position>, StoreError> {
        if n == 0 {
            return Ok(vec![]);
        }
        let query = recent_query(&self.config.measurement, n);
        let request = self.client.get(self.endpoint("query")).query(&[
            ("db", self.config.database.as_str()),
            ("epoch", "ns"),
            ("q", query.as_str()),
        ]);
        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::QueryFailed(format!("{status}: {body}")));
        }
        let response = response
            .json::<QueryResponse>()
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        decode_positions(response)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<QueryResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Formats a position as one line of the InfluxDB line protocol.
fn line_protocol(measurement: &str, position: &Position, precision: Precision) -> String {
    format!(
        "{} {LATITUDE_FIELD}={},{LONGITUDE_FIELD}={} {}",
        escape_measurement(measurement),
        position.latitude(),
        position.longitude(),
        precision.scale(&position.timestamp())
    )
}

fn escape_measurement(measurement: &str) -> String {
    measurement.replace(',', "\\,").replace(' ', "\\ ")
}

fn recent_query(measurement: &str, n: usize) -> String {
    format!(
        "SELECT \"{LATITUDE_FIELD}\", \"{LONGITUDE_FIELD}\" FROM \"{}\" ORDER BY time DESC LIMIT {n}",
        measurement.replace('"', "\\\"")
    )
}

/// Converts a query response with `epoch=ns` timestamps into positions.
///
/// Rows are kept in response order. Rows without a usable time, latitude or
/// longitude are logged and skipped.
fn decode_positions(response: QueryResponse) -> Result<Vec<Position>, StoreError> {
    if let Some(e) = response.error {
        return Err(StoreError::QueryFailed(e));
    }
    let mut positions = Vec::new();
    for result in response.results {
        if let Some(e) = result.error {
            return Err(StoreError::QueryFailed(e));
        }
        for series in result.series {
            let column = |name: &str| series.columns.iter().position(|c| c == name);
            let (Some(time), Some(lat), Some(lon)) = (
                column(TIME_COLUMN),
                column(LATITUDE_FIELD),
                column(LONGITUDE_FIELD),
            ) else {
                return Err(StoreError::QueryFailed(format!(
                    "unexpected columns {:?}",
                    series.columns
                )));
            };
            for row in &series.values {
                let timestamp = row
                    .get(time)
                    .and_then(serde_json::Value::as_i64)
                    .map(DateTime::from_timestamp_nanos);
                let latitude = row.get(lat).and_then(serde_json::Value::as_f64);
                let longitude = row.get(lon).and_then(serde_json::Value::as_f64);
                match (latitude, longitude, timestamp) {
                    (Some(latitude), Some(longitude), Some(timestamp)) => {
                        positions.push(Position::new(latitude, longitude, timestamp))
                    }
                    _ => error!("Skipping incomplete InfluxDB row {:?}", row),
                }
            }
        }
    }
    Ok(positions)
}
