// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use ingest::{IngestConfig, IngestionPipeline};
use module_core::{EventBus, Module};
use query::{DEFAULT_QUERY_TIMEOUT, QueryService};
use rest::{RestConfig, RestCtx, build_rocket};
use rocket::local::asynchronous::Client;
use std::sync::Arc;
use storage::{MemoryStore, PositionStore};
use tokio::task::JoinHandle;

pub struct TestServer {
    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub pipeline: JoinHandle<Result<(), ()>>,
}

/// Starts the ingestion pipeline on a memory store and builds a local client
/// for the HTTP routes.
pub async fn create_server(eb: &EventBus) -> TestServer {
    let store = Arc::new(MemoryStore::new());
    let shared: Arc<dyn PositionStore> = store.clone();
    let (mut pipeline, handle) =
        IngestionPipeline::new(eb.context(), shared.clone(), IngestConfig::default());
    let pipeline = tokio::spawn(async move { pipeline.run().await });

    let config = RestConfig::default();
    let ctx = RestCtx::new(
        handle,
        QueryService::new(shared, DEFAULT_QUERY_TIMEOUT),
        &config,
    );
    let client = Client::tracked(build_rocket(&config, ctx))
        .await
        .expect("Failed to create rocket client");
    TestServer {
        client,
        store,
        pipeline,
    }
}
