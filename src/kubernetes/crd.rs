// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::error::Result;
use crate::types::ServiceBinding;
use kube::discovery::{ApiResource, Discovery};
use kube::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for the ServiceBinding CRD to be served.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_binding_crd(client: &Client) -> Result<()> {
    let wanted = ApiResource::erase::<ServiceBinding>(&());
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match crd_served(client, &wanted).await {
            Ok(true) => {
                info!("ServiceBinding CRD ({}) is available", wanted.api_version);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "ServiceBinding CRD ({}) not yet available, waiting {} seconds...",
                    wanted.api_version, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for ServiceBinding CRD: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        interval = next_interval(interval);
    }
}

fn next_interval(interval: u64) -> u64 {
    (interval * 2).min(POLL_MAX_INTERVAL_SECS)
}

async fn crd_served(client: &Client, wanted: &ApiResource) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[wanted.group.as_str()])
        .run()
        .await?;

    let served = discovery
        .groups()
        .filter(|group| group.name() == wanted.group)
        .flat_map(|group| group.recommended_resources())
        .any(|(ar, _)| ar.kind == wanted.kind && ar.version == wanted.version);
    Ok(served)
}
