// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Work queue, worker pool and watches driving reconciles.

pub mod manager;
pub mod queue;
pub mod watch;

pub use manager::{Reconcile, SyncManager};
pub use queue::{ObjectKey, WorkQueue};
pub use watch::{bindings_for_object, watch_bindings, ResourceWatcher, WatchRegistry};
