// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

/// Store write retries override (`JC_STORE_RETRIES`)
pub fn store_retries() -> Option<u32> {
    std::env::var("JC_STORE_RETRIES").ok().and_then(|s| s.parse::<u32>().ok())
}

/// Backoff between store write retries (`JC_RETRY_BACKOFF_MS`)
pub fn retry_backoff() -> Option<Duration> {
    std::env::var("JC_RETRY_BACKOFF_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
