// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence for the in-memory store.
//!
//! A snapshot holds every build, log message and progress tree at a point
//! in time. On disk it is zstd-compressed JSON, written to a temporary file
//! and renamed into place.

use crate::memory::{Inner, MemoryStore};
use chrono::{DateTime, Utc};
use jc_core::{BuildId, BuildRecord, Clock, LogEntry, ProgressTree};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 2;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot version {found} is newer than supported ({supported})")]
    Version { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildLogs {
    pub build_id: BuildId,
    pub entries: Vec<LogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub builds: Vec<BuildRecord>,
    #[serde(default)]
    pub logs: Vec<BuildLogs>,
    #[serde(default)]
    pub progress: Vec<(BuildId, ProgressTree)>,
    pub next_id: u64,
    pub next_log_seq: u64,
    /// Last store timestamp handed out; restored stores never go below it
    pub last_stamp_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl StoreSnapshot {
    /// Write as zstd-compressed JSON.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let tmp = path.with_extension("tmp");
        {
            let file = BufWriter::new(File::create(&tmp)?);
            let mut encoder = zstd::stream::Encoder::new(file, ZSTD_LEVEL)?;
            serde_json::to_writer(&mut encoder, self)?;
            encoder.finish()?.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let decoder = zstd::stream::Decoder::new(BufReader::new(File::open(path)?))?;
        let snapshot: Self = serde_json::from_reader(decoder)?;
        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

impl<C: Clock> MemoryStore<C> {
    /// Point-in-time copy of the whole store.
    pub fn snapshot(&self) -> StoreSnapshot {
        let (builds, logs, next_id, next_log_seq) = {
            let inner = self.inner.read();
            let mut logs: Vec<BuildLogs> = inner
                .logs
                .iter()
                .map(|(&build_id, entries)| BuildLogs { build_id, entries: entries.clone() })
                .collect();
            logs.sort_by_key(|l| l.build_id);
            (inner.builds.values().cloned().collect(), logs, inner.next_id, inner.next_log_seq)
        };
        let mut progress: Vec<(BuildId, ProgressTree)> =
            self.progress.read().iter().map(|(&id, tree)| (id, tree.read().clone())).collect();
        progress.sort_by_key(|(id, _)| *id);
        let last_stamp_ms = *self.last_stamp.lock();
        StoreSnapshot {
            version: CURRENT_SNAPSHOT_VERSION,
            builds,
            logs,
            progress,
            next_id,
            next_log_seq,
            last_stamp_ms,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a store from a snapshot. Unfinished builds keep their place
    /// in the running index, so a build left `Running` by a crash still
    /// blocks new builds of the same key until it is reconciled.
    pub fn restore(clock: C, snapshot: StoreSnapshot) -> Result<Self, SnapshotError> {
        if snapshot.version > CURRENT_SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
                supported: CURRENT_SNAPSHOT_VERSION,
            });
        }
        let mut inner = Inner {
            next_id: snapshot.next_id.max(1),
            next_log_seq: snapshot.next_log_seq.max(1),
            ..Inner::default()
        };
        for build in snapshot.builds {
            if !build.finished() {
                inner.running.insert((build.job_id.clone(), build.param_key.clone()), build.id);
            }
            inner.next_id = inner.next_id.max(build.id.0 + 1);
            inner.builds.insert(build.id, build);
        }
        for BuildLogs { build_id, entries } in snapshot.logs {
            inner.logs.insert(build_id, entries);
        }
        let progress: HashMap<_, _> = snapshot
            .progress
            .into_iter()
            .map(|(id, tree)| (id, Arc::new(RwLock::new(tree))))
            .collect();
        tracing::info!(
            builds = inner.builds.len(),
            running = inner.running.len(),
            "restored store from snapshot"
        );
        Ok(Self {
            clock,
            last_stamp: Mutex::new(snapshot.last_stamp_ms),
            inner: RwLock::new(inner),
            progress: RwLock::new(progress),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        self.snapshot().save(path)
    }

    pub fn load(clock: C, path: &Path) -> Result<Self, SnapshotError> {
        Self::restore(clock, StoreSnapshot::load(path)?)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
