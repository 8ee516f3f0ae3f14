// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{PositionStore, StoreError, insert_ordered, newest_first};
use async_trait::async_trait;
use common::position::Position;
use std::{
    fs::DirBuilder,
    io::{self, SeekFrom},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
    sync::Mutex,
};
use tracing::{debug, error, info, warn};

const LOG_FILE_NAME: &str = "positions";
const LOG_FILE_EXTENSION: &str = "log";

/// A file system–based implementation of a position store.
///
/// Every position is appended as one JSON line to `<root_dir>/positions.log`
/// and synced to disk before the write returns. Lines that can't be decoded,
/// including invalid UTF-8 and the remains of an interrupted append, are
/// logged and skipped.
///
/// The log is read once, on the first query. After that the positions are
/// served from memory and every successful write is added to that copy, so
/// the memory use grows with the log.
///
/// ## Important
///
/// `FileSystemStore` serializes its own appends but does not lock the file
/// against other processes. Therefore, **only one instance should be used per
/// `root_dir` at any time**. Changes made to the log by anything else after
/// the first query are not seen.
pub struct FileSystemStore {
    log_file_path: PathBuf,
    // ascending by timestamp, None until the log was read
    positions: Mutex<Option<Vec<Position>>>,
}

impl FileSystemStore {
    /// Creates the store, creating `root_dir` if it does not exist yet.
    pub fn new(root_dir: &Path) -> io::Result<Self> {
        DirBuilder::new().recursive(true).create(root_dir)?;
        let mut log_file_path = root_dir.to_path_buf();
        log_file_path.push(LOG_FILE_NAME);
        log_file_path.set_extension(LOG_FILE_EXTENSION);
        info!(
            "Using position log file: {}",
            log_file_path.to_string_lossy()
        );
        Ok(FileSystemStore {
            log_file_path,
            positions: Mutex::new(None),
        })
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }

    /// Appends one line to the log and syncs the file data.
    ///
    /// A log that doesn't end with a newline was cut off by an interrupted
    /// append; the new line is started on a line of its own.
    async fn append_line(&self, line: &str) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.log_file_path)
            .await
            .map_err(|e| StoreError::Unavailable(self.describe(&e)))?;
        let terminated = ends_with_newline(&mut file)
            .await
            .map_err(|e| StoreError::Unavailable(self.describe(&e)))?;
        let mut bytes = Vec::with_capacity(line.len() + 2);
        if !terminated {
            warn!(
                "{} ends with an incomplete line",
                self.log_file_path.to_string_lossy()
            );
            bytes.push(b'\n');
        }
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        file.write_all(&bytes)
            .await
            .map_err(|e| StoreError::WriteRejected(self.describe(&e)))?;
        file.sync_data()
            .await
            .map_err(|e| StoreError::WriteRejected(self.describe(&e)))?;
        Ok(())
    }

    /// Loads every readable position of the log, ascending by timestamp.
    ///
    /// Lines are decoded one by one; lines that fail to decode are logged and
    /// skipped. A missing log file is an empty store.
    async fn load(&self) -> io::Result<Vec<Position>> {
        let file = match File::open(&self.log_file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };
        let mut lines = BufReader::new(file).split(b'\n');
        let mut positions = Vec::new();
        let mut number = 0;
        while let Some(line) = lines.next_segment().await? {
            number += 1;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<Position>(&line) {
                Ok(position) => positions.push(position),
                Err(e) => {
                    error!(
                        "Failed to parse line {} of {}. Error: {}",
                        number,
                        self.log_file_path.to_string_lossy(),
                        e
                    );
                }
            }
        }
        // stable, so positions with equal timestamps stay in write order
        positions.sort_by_key(|p| p.timestamp());
        debug!(
            "Loaded {} position(s) from {}",
            positions.len(),
            self.log_file_path.to_string_lossy()
        );
        Ok(positions)
    }

    fn describe(&self, e: &io::Error) -> String {
        format!("{}: {}", self.log_file_path.to_string_lossy(), e)
    }
}

/// Returns `true` for an empty file or one whose last byte is a newline.
async fn ends_with_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] == b'\n')
}

#[async_trait]
impl PositionStore for FileSystemStore {
    async fn write(&self, position: &Position) -> Result<(), StoreError> {
        let line = position
            .to_json()
            .map_err(|e| StoreError::WriteRejected(e.to_string()))?;
        let mut positions = self.positions.lock().await;
        self.append_line(&line).await?;
        if let Some(positions) = positions.as_mut() {
            insert_ordered(positions, *position);
        }
        debug!(
            "Appended position {} to {}",
            line,
            self.log_file_path.to_string_lossy()
        );
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<Position>, StoreError> {
        let mut positions = self.positions.lock().await;
        if positions.is_none() {
            let loaded = self
                .load()
                .await
                .map_err(|e| StoreError::QueryFailed(self.describe(&e)))?;
            *positions = Some(loaded);
        }
        Ok(positions
            .as_deref()
            .map(|positions| newest_first(positions, n))
            .unwrap_or_default())
    }
}
