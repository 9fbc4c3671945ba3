// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress and log sinks handed to running jobs.
//!
//! Both write straight to the store. Write failures are logged via tracing
//! but do not propagate; reporting must never fail a build.

use jc_core::{BuildId, JobId, LogEntry, LogLevel, ProgressReport};
use jc_storage::BuildStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProgressSink {
    build_id: BuildId,
    job_id: JobId,
    store: Arc<dyn BuildStore>,
}

impl ProgressSink {
    pub fn new(build_id: BuildId, job_id: JobId, store: Arc<dyn BuildStore>) -> Self {
        Self { build_id, job_id, store }
    }

    /// Set `(current, total)` at `path`; an empty path addresses the whole
    /// build.
    pub fn report<S: AsRef<str>>(&self, path: &[S], current: u64, total: u64) {
        self.send(ProgressReport::new(path, current, total));
    }

    pub fn report_status<S: AsRef<str>>(
        &self,
        path: &[S],
        current: u64,
        total: u64,
        status_line: impl Into<String>,
    ) {
        self.send(ProgressReport::new(path, current, total).status(status_line));
    }

    pub fn send(&self, report: ProgressReport) {
        if let Err(e) = self.store.report_progress(self.build_id, report) {
            tracing::warn!(
                job_id = %self.job_id,
                build_id = %self.build_id,
                error = %e,
                "failed to record progress"
            );
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink").field("build_id", &self.build_id).finish()
    }
}

#[derive(Clone)]
pub struct LogSink {
    build_id: BuildId,
    job_id: JobId,
    store: Arc<dyn BuildStore>,
}

impl LogSink {
    pub fn new(build_id: BuildId, job_id: JobId, store: Arc<dyn BuildStore>) -> Self {
        Self { build_id, job_id, store }
    }

    /// Append an entry to the build log, mirrored as a tracing debug event.
    pub fn log(&self, entry: LogEntry) {
        tracing::debug!(
            job_id = %self.job_id,
            build_id = %self.build_id,
            level = %entry.level,
            logger = %entry.logger,
            "{}",
            entry.message
        );
        if let Err(e) = self.store.append_log(self.build_id, entry) {
            tracing::warn!(
                job_id = %self.job_id,
                build_id = %self.build_id,
                error = %e,
                "failed to write build log"
            );
        }
    }

    fn message(&self, level: LogLevel, message: impl Into<String>) {
        self.log(LogEntry::new(level, self.job_id.as_str(), message));
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.message(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.message(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.message(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.message(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.message(LogLevel::Critical, message);
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink").field("build_id", &self.build_id).finish()
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
