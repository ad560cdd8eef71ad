// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Worker pool draining the work queue.

use super::queue::{ObjectKey, WorkQueue};
use crate::config::Config;
use crate::reconcilers::ReconcileResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// A single reconcile pass for the object behind `key`.
#[async_trait]
pub trait Reconcile: Send + Sync {
    async fn reconcile(&self, key: &ObjectKey) -> ReconcileResult;
}

/// Runs `max_concurrent_reconciles` workers over a shared queue.
///
/// The queue never hands the same key to two workers at once, so reconciles
/// of one binding are serialized while different bindings proceed in
/// parallel.
pub struct SyncManager {
    config: Config,
    queue: WorkQueue,
    reconciler: Arc<dyn Reconcile>,
}

impl SyncManager {
    pub fn new(config: Config, queue: WorkQueue, reconciler: Arc<dyn Reconcile>) -> Self {
        Self {
            config,
            queue,
            reconciler,
        }
    }

    /// Run until the queue is shut down
    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            "SyncManager started with {} workers",
            self.config.max_concurrent_reconciles
        );

        let workers: Vec<_> = (0..self.config.max_concurrent_reconciles)
            .map(|id| {
                tokio::spawn(worker(
                    id,
                    self.queue.clone(),
                    self.reconciler.clone(),
                    self.config.requeue_delay,
                ))
            })
            .collect();

        for handle in workers {
            handle.await?;
        }

        info!("SyncManager stopped");
        Ok(())
    }
}

async fn worker(id: usize, queue: WorkQueue, reconciler: Arc<dyn Reconcile>, delay: Duration) {
    while let Some(key) = queue.get().await {
        debug!(worker = id, "Reconciling {}", key);
        let result = reconciler.reconcile(&key).await;

        if let Some(e) = &result.error {
            error!("Reconcile of {} failed: {}", key, e);
        }
        if result.requeue {
            debug!("Requeueing {} in {:?}", key, delay);
            queue.add_after(key.clone(), delay);
        }
        queue.done(&key);
    }
    debug!(worker = id, "Worker stopped");
}
