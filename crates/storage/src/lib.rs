// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! jc-storage: Build history storage for Job Control
//!
//! The [`BuildStore`] trait is the single arbiter of concurrent mutation of
//! build records, log messages and progress. [`MemoryStore`] is the
//! reference implementation and can persist itself through snapshots.

mod memory;
mod snapshot;
mod store;

pub use memory::MemoryStore;
pub use snapshot::{BuildLogs, SnapshotError, StoreSnapshot, CURRENT_SNAPSHOT_VERSION};
pub use store::{
    BuildFilter, BuildStore, BuildUpdate, KeyFilter, LogFilter, Order, PruneFilter, StoreError,
};
