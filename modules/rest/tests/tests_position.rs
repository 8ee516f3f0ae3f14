// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

mod test_utils;

use common::ingest::TaskState;
use module_core::{
    EventBus, EventKind, EventKindType,
    test_helper::{stop_module, wait_for_event},
};
use rocket::http::{ContentType, Status};
use std::time::Duration;
use test_utils::create_server;

async fn wait_for_report(rx: &mut tokio::sync::broadcast::Receiver<module_core::Event>) -> TaskState {
    let event = wait_for_event(rx, Duration::from_millis(500), EventKindType::IngestReportEvent).await;
    match event.kind {
        EventKind::IngestReportEvent(report) => report.state,
        _ => panic!("Unexpected event {:?}", event),
    }
}

#[tokio::test]
#[test_log::test]
async fn post_then_get_position() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let mut server = create_server(&eb).await;

    let response = server
        .client
        .post("/position")
        .header(ContentType::Form)
        .body("points=48.68+11.29")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert!(response.into_string().await.unwrap_or_default().is_empty());

    assert_eq!(wait_for_report(&mut rx).await, TaskState::Stored);
    let response = server.client.get("/position").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value =
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    assert_eq!(body["lat"], 48.68);
    assert_eq!(body["lon"], 11.29);
    assert!(body["time"].is_string());

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn post_without_points_is_acknowledged_but_not_stored() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let mut server = create_server(&eb).await;

    let response = server
        .client
        .post("/position")
        .header(ContentType::Form)
        .body("lat=48.68&lon=11.29")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    assert_eq!(wait_for_report(&mut rx).await, TaskState::ParseFailed);
    assert!(server.store.is_empty());
    let response = server.client.get("/position").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn get_position_without_data() {
    let eb = EventBus::default();
    let mut server = create_server(&eb).await;

    let response = server.client.get("/position").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
    assert!(response.into_string().await.unwrap_or_default().is_empty());

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn empty_track_is_valid_gpx() {
    let eb = EventBus::default();
    let mut server = create_server(&eb).await;

    let response = server.client.get("/track").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.content_type(),
        Some(ContentType::new("application", "gpx+xml"))
    );
    let xml = response.into_string().await.unwrap();
    let gpx = gpx::read(xml.as_bytes()).unwrap();
    assert_eq!(gpx.tracks.len(), 1);
    assert_eq!(gpx.tracks[0].segments.len(), 1);
    assert!(gpx.tracks[0].segments[0].points.is_empty());

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn track_lists_recent_positions_oldest_first() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let mut server = create_server(&eb).await;

    for body in ["points=1+10", "points=2+20", "points=3+30"] {
        let response = server.client.post("/position").body(body).dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(wait_for_report(&mut rx).await, TaskState::Stored);
    }

    let response = server.client.get("/track?n=2").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let gpx = gpx::read(response.into_string().await.unwrap().as_bytes()).unwrap();
    let points = &gpx.tracks[0].segments[0].points;
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].point().y(), 2.0);
    assert_eq!(points[1].point().y(), 3.0);
    assert!(points[0].time.is_some());

    let response = server.client.get("/track").dispatch().await;
    let gpx = gpx::read(response.into_string().await.unwrap().as_bytes()).unwrap();
    assert_eq!(gpx.tracks[0].segments[0].points.len(), 3);

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn oversized_report_is_acknowledged_and_dropped() {
    let eb = EventBus::default();
    let mut server = create_server(&eb).await;

    let body = format!("points=1+1&pad={}", "x".repeat(70 * 1024));
    let response = server.client.post("/position").body(body).dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let response = server.client.get("/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let body: serde_json::Value =
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ingest"]["accepted"], 0);

    stop_module(&eb, &mut server.pipeline).await;
}

#[tokio::test]
#[test_log::test]
async fn health_counts_ingested_reports() {
    let eb = EventBus::default();
    let mut rx = eb.subscribe();
    let mut server = create_server(&eb).await;

    server.client.post("/position").body("points=1+1").dispatch().await;
    assert_eq!(wait_for_report(&mut rx).await, TaskState::Stored);
    server.client.post("/position").body("points=1").dispatch().await;
    assert_eq!(wait_for_report(&mut rx).await, TaskState::ParseFailed);

    let response = server.client.get("/health").dispatch().await;
    let body: serde_json::Value =
        serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
    assert_eq!(body["ingest"]["accepted"], 2);
    assert_eq!(body["ingest"]["stored"], 1);
    assert_eq!(body["ingest"]["parse_failed"], 1);

    stop_module(&eb, &mut server.pipeline).await;
}
