// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::Parser;
use ingest::IngestionPipeline;
use module_core::{Event, EventBus, EventKind, Module};
use query::QueryService;
use rest::{Rest, RestCtx};
use std::sync::Arc;
use storage::{FileSystemStore, InfluxStore, MemoryStore, PositionStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::{Cli, StoreBackend};

fn create_store(cli: &Cli) -> Result<Arc<dyn PositionStore>, ()> {
    match cli.store {
        StoreBackend::Memory => {
            info!("Using in-memory position store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            let storage_dir = cli.storage_dir()?;
            let store = FileSystemStore::new(&storage_dir).map_err(|e| {
                error!(
                    "Failed to create storage dir {}. Error: {}",
                    storage_dir.to_string_lossy(),
                    e
                );
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Influx => {
            let store = InfluxStore::new(cli.influx_config())
                .map_err(|e| error!("Failed to create InfluxDB client. Error: {}", e))?;
            Ok(Arc::new(store))
        }
    }
}

/// Publishes a [`EventKind::QuitEvent`] on Ctrl-C so every module can stop.
fn install_quit_handler(eb: &EventBus) -> Result<(), ()> {
    let sender = eb.sender();
    ctrlc::set_handler(move || {
        info!("Received Ctrl-C, stopping modules...");
        let _ = sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .map_err(|e| error!("Failed to install Ctrl-C handler. Error: {}", e))
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = create_store(&cli)?;
    let eb = EventBus::default();
    install_quit_handler(&eb)?;

    let rest_config = cli.rest_config();
    let (mut pipeline, ingest_handle) =
        IngestionPipeline::new(eb.context(), store.clone(), cli.ingest_config());
    let query = QueryService::new(store, cli.query_timeout());
    let mut rest = Rest::new(
        eb.context(),
        rest_config.clone(),
        RestCtx::new(ingest_handle, query, &rest_config),
    );

    info!("Starting modules...");
    let rest_task = async {
        let result = rest.run().await;
        // the pipeline must not outlive a failed server
        eb.publish(&Event {
            kind: EventKind::QuitEvent,
        });
        result
    };
    let (pipeline_result, rest_result) = tokio::join!(pipeline.run(), rest_task);
    pipeline_result.and(rest_result)
}
