// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::RestCtx;
use chrono::{DateTime, Utc};
use common::{payload::RawPayload, position::Position};
use ingest::IngestStatsSnapshot;
use rocket::{Data, State, get, http::ContentType, http::Status, post, serde::json::Json};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Upper bound of the `n` parameter of `GET /track`.
const MAX_TRACK_LENGTH: usize = 10_000;

/// A status without body. Keeps Rocket's catchers from rendering an error page.
type EmptyResponse = (Status, ());

#[derive(Debug, Serialize)]
pub(crate) struct PositionResponse {
    lat: f64,
    lon: f64,
    time: DateTime<Utc>,
}

impl From<Position> for PositionResponse {
    fn from(position: Position) -> Self {
        PositionResponse {
            lat: position.latitude(),
            lon: position.longitude(),
            time: position.timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    ingest: IngestStatsSnapshot,
}

/// Tracker endpoint.
///
/// Route: POST /position
/// Always answers `200 OK` with an empty body before the report is parsed or
/// stored. Bodies that can't be read or exceed the body limit are logged
/// and dropped.
#[post("/position", data = "<data>")]
pub(crate) async fn post_position(data: Data<'_>, ctx: &State<RestCtx>) -> Status {
    match data.open(ctx.body_limit).into_string().await {
        Ok(body) if body.is_complete() => {
            let ack = ctx.ingest.ingest(RawPayload::from(body.into_inner()));
            debug!("Accepted position report as task {}", ack.task);
        }
        Ok(_) => warn!(
            "Dropping position report larger than {} bytes",
            ctx.body_limit
        ),
        Err(e) => warn!("Failed to read position report. Error: {}", e),
    }
    Status::Ok
}

/// Latest position.
///
/// Route: GET /position
/// - `200` with `{"lat":..,"lon":..,"time":..}`
/// - `404` with empty body if no position was stored yet
/// - `503` with empty body if the store can't be read
#[get("/position")]
pub(crate) async fn get_position(
    ctx: &State<RestCtx>,
) -> Result<Json<PositionResponse>, EmptyResponse> {
    match ctx.query.latest().await {
        Ok(Some(position)) => Ok(Json(position.into())),
        Ok(None) => Err((Status::NotFound, ())),
        Err(e) => {
            error!("Failed to query latest position. Error: {}", e);
            Err((Status::ServiceUnavailable, ()))
        }
    }
}

/// Recent track as GPX document, oldest position first.
///
/// Route: GET /track?n=<count>
#[get("/track?<n>")]
pub(crate) async fn get_track(
    n: Option<usize>,
    ctx: &State<RestCtx>,
) -> Result<(ContentType, String), EmptyResponse> {
    let n = n.unwrap_or(ctx.track_length).min(MAX_TRACK_LENGTH);
    let track = ctx.query.track(n).await;
    match track.to_gpx_string() {
        Ok(xml) => Ok((gpx_content_type(), xml)),
        Err(e) => {
            error!("Failed to export track. Error: {}", e);
            Err((Status::ServiceUnavailable, ()))
        }
    }
}

/// Route: GET /health
#[get("/health")]
pub(crate) fn get_health(ctx: &State<RestCtx>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ingest: ctx.ingest.stats(),
    })
}

fn gpx_content_type() -> ContentType {
    ContentType::new("application", "gpx+xml")
}
