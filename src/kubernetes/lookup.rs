// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution between kinds and API resources.

use crate::error::{Error, Result};
use crate::types::gvk::{Gvr, Referable};
use async_trait::async_trait;
use kube::api::GroupVersionKind;
use kube::discovery::{ApiResource, Discovery};
use kube::Client;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Maps kinds to resources and back.
#[async_trait]
pub trait TypeLookup: Send + Sync {
    async fn resource_for_kind(&self, gvk: &GroupVersionKind) -> Result<ApiResource>;

    async fn kind_for_resource(&self, gvr: &Gvr) -> Result<ApiResource>;

    /// Prefer the explicit resource name, fall back to the kind.
    async fn resource_for_referable(
        &self,
        referable: &(dyn Referable + Sync),
    ) -> Result<ApiResource> {
        if let Some(gvr) = referable.gvr() {
            return self.kind_for_resource(&gvr).await;
        }
        match referable.gvk() {
            Some(gvk) => self.resource_for_kind(&gvk).await,
            None => Err(Error::UnknownResource(
                "reference without kind or resource".to_string(),
            )),
        }
    }
}

/// Find a resource in a discovered set.
pub fn find_by_kind<'a>(
    resources: &'a [ApiResource],
    gvk: &GroupVersionKind,
) -> Option<&'a ApiResource> {
    resources
        .iter()
        .find(|ar| ar.group == gvk.group && ar.version == gvk.version && ar.kind == gvk.kind)
}

pub fn find_by_resource<'a>(resources: &'a [ApiResource], gvr: &Gvr) -> Option<&'a ApiResource> {
    resources.iter().find(|ar| {
        ar.group == gvr.group && ar.version == gvr.version && ar.plural == gvr.resource
    })
}

struct DiscoveryCache {
    resources: Vec<ApiResource>,
    refreshed_at: Option<Instant>,
}

/// [`TypeLookup`] backed by API discovery.
///
/// The discovered set is cached and refreshed on a miss, at most once per
/// `refresh_interval`, so newly installed CRDs are eventually found.
pub struct KubeTypeLookup {
    client: Client,
    refresh_interval: Duration,
    cache: RwLock<DiscoveryCache>,
}

impl KubeTypeLookup {
    pub fn new(client: Client, refresh_interval: Duration) -> Self {
        Self {
            client,
            refresh_interval,
            cache: RwLock::new(DiscoveryCache {
                resources: Vec::new(),
                refreshed_at: None,
            }),
        }
    }

    async fn refresh(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        let fresh = cache
            .refreshed_at
            .is_some_and(|at| at.elapsed() < self.refresh_interval);
        if fresh {
            return Ok(());
        }

        let discovery = Discovery::new(self.client.clone()).run().await?;
        let mut resources = Vec::new();
        for group in discovery.groups() {
            for version in group.versions() {
                for (ar, _caps) in group.versioned_resources(version) {
                    resources.push(ar);
                }
            }
        }

        info!("Discovered {} API resources", resources.len());
        cache.resources = resources;
        cache.refreshed_at = Some(Instant::now());
        Ok(())
    }

    async fn find<F>(&self, describe: String, matcher: F) -> Result<ApiResource>
    where
        F: Fn(&[ApiResource]) -> Option<ApiResource> + Send + Sync,
    {
        if let Some(found) = matcher(&self.cache.read().await.resources) {
            return Ok(found);
        }
        debug!("{} not cached, refreshing discovery", describe);
        self.refresh().await?;
        matcher(&self.cache.read().await.resources).ok_or(Error::UnknownResource(describe))
    }
}

#[async_trait]
impl TypeLookup for KubeTypeLookup {
    async fn resource_for_kind(&self, gvk: &GroupVersionKind) -> Result<ApiResource> {
        let describe = format!("{}/{}, Kind={}", gvk.group, gvk.version, gvk.kind);
        self.find(describe, |resources| find_by_kind(resources, gvk).cloned())
            .await
    }

    async fn kind_for_resource(&self, gvr: &Gvr) -> Result<ApiResource> {
        self.find(gvr.to_string(), |resources| {
            find_by_resource(resources, gvr).cloned()
        })
        .await
    }
}
