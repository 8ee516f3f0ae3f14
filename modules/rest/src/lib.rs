// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! HTTP surface of the locator.
//!
//! Serves the tracker endpoint `POST /position`, the queries `GET /position`
//! and `GET /track`, a health report and optionally a static file directory.

use async_trait::async_trait;
use ingest::IngestHandle;
use module_core::{EventKind, Module, ModuleCtx};
use query::QueryService;
use rocket::{
    Build, Rocket,
    config::{Shutdown, TlsConfig},
    data::{ByteUnit, ToByteUnit},
    fs::FileServer,
    routes,
};
use std::{net::IpAddr, path::PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

mod position;

/// Certificate chain and private key of the TLS listener, both PEM encoded.
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub certs: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RestConfig {
    pub address: IpAddr,
    pub port: u16,
    pub tls: Option<TlsFiles>,
    /// Directory served at `/`, if any.
    pub static_dir: Option<PathBuf>,
    /// Number of positions of `GET /track` without `n`.
    pub track_length: usize,
    /// Largest accepted tracker payload.
    pub body_limit: ByteUnit,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            address: IpAddr::from([0, 0, 0, 0]),
            port: 8023,
            tls: None,
            static_dir: None,
            track_length: 100,
            body_limit: 64.kibibytes(),
        }
    }
}

/// Shared state of the request handlers.
#[derive(Clone)]
pub struct RestCtx {
    pub ingest: IngestHandle,
    pub query: QueryService,
    pub track_length: usize,
    pub body_limit: ByteUnit,
}

impl RestCtx {
    pub fn new(ingest: IngestHandle, query: QueryService, config: &RestConfig) -> Self {
        RestCtx {
            ingest,
            query,
            track_length: config.track_length,
            body_limit: config.body_limit,
        }
    }
}

/// Builds the Rocket instance with every route mounted.
pub fn build_rocket(config: &RestConfig, ctx: RestCtx) -> Rocket<Build> {
    let rocket_config = rocket::Config {
        address: config.address,
        port: config.port,
        tls: config
            .tls
            .as_ref()
            .map(|tls| TlsConfig::from_paths(&tls.certs, &tls.key)),
        shutdown: Shutdown {
            // Ctrl-C arrives as QuitEvent on the event bus
            ctrlc: false,
            ..Shutdown::default()
        },
        ..rocket::Config::default()
    };
    let mut rocket = rocket::custom(rocket_config).manage(ctx).mount(
        "/",
        routes![
            position::post_position,
            position::get_position,
            position::get_track,
            position::get_health
        ],
    );
    if let Some(static_dir) = &config.static_dir {
        info!("Serving static files from {}", static_dir.to_string_lossy());
        rocket = rocket.mount("/", FileServer::from(static_dir));
    }
    rocket
}

pub struct Rest {
    ctx: ModuleCtx,
    config: RestConfig,
    state: RestCtx,
}

impl Rest {
    pub fn new(ctx: ModuleCtx, config: RestConfig, state: RestCtx) -> Self {
        Rest { ctx, config, state }
    }
}

#[async_trait]
impl Module for Rest {
    async fn run(&mut self) -> Result<(), ()> {
        let rocket = build_rocket(&self.config, self.state.clone())
            .ignite()
            .await
            .map_err(|e| error!("Failed to start HTTP server. Error: {}", e))?;
        let shutdown = rocket.shutdown();
        let mut server = tokio::spawn(rocket.launch());
        info!(
            "REST module started on {}:{}",
            self.config.address, self.config.port
        );

        loop {
            tokio::select! {
                result = &mut server => {
                    return match result {
                        Ok(Ok(_)) => {
                            info!("HTTP server stopped");
                            Ok(())
                        }
                        Ok(Err(e)) => {
                            error!("HTTP server failed. Error: {}", e);
                            Err(())
                        }
                        Err(e) => {
                            error!("HTTP server task failed. Error: {}", e);
                            Err(())
                        }
                    };
                }
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                info!("Shutting down HTTP server");
                                shutdown.notify();
                                let _ = server.await;
                                return Ok(());
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("REST module skipped {} event(s)", skipped);
                        }
                        Err(RecvError::Closed) => {
                            shutdown.notify();
                            let _ = server.await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
