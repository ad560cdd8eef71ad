// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use service_binding::config::Config;
use service_binding::kubernetes::{wait_for_binding_crd, KubeStore, KubeTypeLookup, ObjectStore};
use service_binding::reconcilers::BindingReconciler;
use service_binding::sync::{watch_bindings, SyncManager, WatchRegistry, WorkQueue};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Service Binding operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: max_concurrent_reconciles={}, watch_namespace={}",
        config.max_concurrent_reconciles,
        config.watch_namespace.as_deref().unwrap_or("<all>")
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    info!("Waiting for ServiceBinding CRD to become available...");
    wait_for_binding_crd(&client).await?;

    let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client.clone()));
    let lookup = Arc::new(KubeTypeLookup::new(client.clone(), config.discovery_refresh));
    let queue = WorkQueue::new();
    let watches = Arc::new(WatchRegistry::new(client.clone(), store.clone(), queue.clone()));

    let reconciler = Arc::new(BindingReconciler::new(store, lookup, watches));
    let manager = SyncManager::new(config.clone(), queue.clone(), reconciler);

    let bindings = tokio::spawn(watch_bindings(client, queue.clone(), config.watch_namespace.clone()));

    let shutdown = {
        let queue = queue.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                return;
            }
            info!("Shutdown requested, draining workers");
            queue.shutdown();
        }
    };

    let (run, ()) = tokio::join!(manager.run(), shutdown);
    bindings.abort();
    run
}
