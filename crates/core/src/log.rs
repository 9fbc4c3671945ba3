// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build log messages and the log retention policy.

use crate::build::ExceptionInfo;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;
const MONTH_MS: u64 = 30 * DAY_MS;
const YEAR_MS: u64 = 365 * DAY_MS;

/// Severity of a build log message, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] =
        [LogLevel::Debug, LogLevel::Info, LogLevel::Warning, LogLevel::Error, LogLevel::Critical];
}

crate::simple_display! {
    LogLevel {
        Debug => "DEBUG",
        Info => "INFO",
        Warning => "WARNING",
        Error => "ERROR",
        Critical => "CRITICAL",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

/// One log message emitted by a running build. Append-only.
///
/// `seq` and `created_ms` are assigned by the store when the entry is
/// appended; values set by the caller are overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub created_ms: u64,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

impl LogEntry {
    pub fn new(level: LogLevel, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            created_ms: 0,
            level,
            logger: logger.into(),
            message: message.into(),
            location: None,
            exception: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        self.location = Some(SourceLocation { file: file.into(), line, function: function.into() });
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// Maximum age of log messages per severity.
///
/// Each rule removes messages older than its age whose level is at or below
/// the rule's level; a rule without a level applies to every message. Rules
/// are applied from least to most severe, the catch-all last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    rules: Vec<(Option<LogLevel>, Duration)>,
}

impl RetentionPolicy {
    /// A policy with no rules; keeps everything.
    pub fn keep_all() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn rule(mut self, level: Option<LogLevel>, max_age: Duration) -> Self {
        self.rules.retain(|(l, _)| *l != level);
        self.rules.push((level, max_age));
        // catch-all last
        self.rules.sort_by_key(|(l, _)| (l.is_none(), *l));
        self
    }

    pub fn rules(&self) -> &[(Option<LogLevel>, Duration)] {
        &self.rules
    }
}

impl Default for RetentionPolicy {
    /// DEBUG 15 days, INFO one month, WARNING three months, ERROR and
    /// CRITICAL six months, anything one year.
    fn default() -> Self {
        Self::keep_all()
            .rule(Some(LogLevel::Debug), Duration::from_millis(15 * DAY_MS))
            .rule(Some(LogLevel::Info), Duration::from_millis(MONTH_MS))
            .rule(Some(LogLevel::Warning), Duration::from_millis(3 * MONTH_MS))
            .rule(Some(LogLevel::Error), Duration::from_millis(6 * MONTH_MS))
            .rule(Some(LogLevel::Critical), Duration::from_millis(6 * MONTH_MS))
            .rule(None, Duration::from_millis(YEAR_MS))
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
