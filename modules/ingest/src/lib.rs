// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Ingestion Modul for the locator
//!
//! Decouples the acknowledgment of a tracker report from its parsing and
//! persistence. The request path hands the raw payload to an [`IngestHandle`],
//! which never waits. The [`IngestionPipeline`] module drains the bounded
//! queue behind the handle, parses each payload and writes it to the store.
//! Failures are logged, counted and published on the event bus; they are never
//! reported back to the tracking client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    ingest::{IngestReport, TaskId, TaskState},
    payload::{NumberPolicy, PayloadParser, RawPayload},
    position::Position,
};
use module_core::{Event, EventKind, Module, ModuleCtx};
use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use storage::PositionStore;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc::{self, error::TrySendError},
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    /// Number of tasks that may wait for the worker before new ones are dropped.
    pub queue_capacity: usize,
    pub number_policy: NumberPolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            queue_capacity: 1024,
            number_policy: NumberPolicy::Strict,
        }
    }
}

/// Acknowledgment handed to the reporting client.
///
/// An `Ack` only states that the report was received. It carries no
/// information about parsing or persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub task: TaskId,
}

/// Counters of ingestion task outcomes.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    stored: AtomicU64,
    parse_failed: AtomicU64,
    store_failed: AtomicU64,
    dropped: AtomicU64,
}

/// A point in time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    pub accepted: u64,
    pub stored: u64,
    pub parse_failed: u64,
    pub store_failed: u64,
    pub dropped: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            parse_failed: self.parse_failed.load(Ordering::Relaxed),
            store_failed: self.store_failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    fn count(&self, state: TaskState) {
        let counter = match state {
            TaskState::Submitted => &self.accepted,
            TaskState::Stored => &self.stored,
            TaskState::ParseFailed => &self.parse_failed,
            TaskState::StoreFailed => &self.store_failed,
            TaskState::Dropped => &self.dropped,
            TaskState::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A received payload waiting for the worker.
#[derive(Debug)]
struct IngestTask {
    id: TaskId,
    raw: RawPayload,
    received_at: DateTime<Utc>,
}

/// Request side of the pipeline. Cheap to clone, one per request handler.
#[derive(Clone)]
pub struct IngestHandle {
    queue: mpsc::Sender<IngestTask>,
    events: broadcast::Sender<Event>,
    next_id: Arc<AtomicU64>,
    stats: Arc<IngestStats>,
}

impl IngestHandle {
    /// Submits a raw payload and acknowledges it immediately.
    ///
    /// Never waits: when the queue is full or the pipeline has stopped the
    /// task is dropped and logged, and the caller is still acknowledged.
    pub fn ingest(&self, raw: RawPayload) -> Ack {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.stats.count(TaskState::Submitted);
        let task = IngestTask {
            id,
            raw,
            received_at: Utc::now(),
        };
        match self.queue.try_send(task) {
            Ok(()) => debug!("Task {} submitted", id),
            Err(TrySendError::Full(task)) => {
                warn!("Ingestion queue is full, dropping task {}", task.id);
                self.drop_task(id);
            }
            Err(TrySendError::Closed(task)) => {
                warn!("Ingestion pipeline stopped, dropping task {}", task.id);
                self.drop_task(id);
            }
        }
        Ack { task: id }
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    fn drop_task(&self, id: TaskId) {
        self.stats.count(TaskState::Dropped);
        let _ = self.events.send(Event {
            kind: EventKind::IngestReportEvent(Arc::new(IngestReport {
                task: id,
                state: TaskState::Dropped,
                position: None,
            })),
        });
    }
}

/// Worker side of the pipeline.
///
/// Tasks are processed one after another in submission order, so the store
/// receives positions in the order they arrived. On [`EventKind::QuitEvent`]
/// the queue is closed and every task already queued still runs to
/// completion.
pub struct IngestionPipeline {
    ctx: ModuleCtx,
    store: Arc<dyn PositionStore>,
    parser: PayloadParser,
    queue: mpsc::Receiver<IngestTask>,
    stats: Arc<IngestStats>,
}

impl IngestionPipeline {
    pub fn new(
        ctx: ModuleCtx,
        store: Arc<dyn PositionStore>,
        config: IngestConfig,
    ) -> (IngestionPipeline, IngestHandle) {
        let (sender, queue) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(IngestStats::default());
        let handle = IngestHandle {
            queue: sender,
            events: ctx.sender.clone(),
            next_id: Arc::new(AtomicU64::new(1)),
            stats: stats.clone(),
        };
        let pipeline = IngestionPipeline {
            ctx,
            store,
            parser: PayloadParser::new(config.number_policy),
            queue,
            stats,
        };
        (pipeline, handle)
    }

    async fn process(&self, task: IngestTask) {
        debug!("Task {} running", task.id);
        let (state, position) = match self.parser.parse_at(&task.raw, task.received_at) {
            Ok(position) => (self.store_position(task.id, &position).await, Some(position)),
            Err(e) => {
                warn!(
                    "Task {} failed to parse payload {:?}. Error: {}",
                    task.id,
                    task.raw.as_str(),
                    e
                );
                (TaskState::ParseFailed, None)
            }
        };
        self.stats.count(state);
        let report = IngestReport {
            task: task.id,
            state,
            position,
        };
        let _ = self
            .ctx
            .publish_event(EventKind::IngestReportEvent(Arc::new(report)));
    }

    async fn store_position(&self, id: TaskId, position: &Position) -> TaskState {
        match self.store.write(position).await {
            Ok(()) => {
                debug!(
                    "Task {} stored position lat: {}, lon: {}",
                    id,
                    position.latitude(),
                    position.longitude()
                );
                TaskState::Stored
            }
            Err(e) => {
                error!("Task {} failed to store position. Error: {}", id, e);
                TaskState::StoreFailed
            }
        }
    }

    async fn drain(&mut self) {
        self.queue.close();
        let mut drained = 0;
        while let Some(task) = self.queue.recv().await {
            self.process(task).await;
            drained += 1;
        }
        info!("Ingestion pipeline drained {} queued task(s)", drained);
    }
}

#[async_trait]
impl Module for IngestionPipeline {
    async fn run(&mut self) -> Result<(), ()> {
        info!("Ingestion pipeline started");
        let mut run = true;
        while run {
            tokio::select! {
                task = self.queue.recv() => {
                    match task {
                        Some(task) => self.process(task).await,
                        None => {
                            info!("All ingestion handles dropped");
                            run = false;
                        }
                    }
                }
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                self.drain().await;
                                run = false;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Ingestion pipeline skipped {} event(s)", skipped);
                        }
                        Err(RecvError::Closed) => {
                            self.drain().await;
                            run = false;
                        }
                    }
                }
            }
        }
        info!("Ingestion pipeline stopped");
        Ok(())
    }
}
