// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of binding requests reconciled in parallel
    pub max_concurrent_reconciles: usize,
    /// Delay before a failed reconcile is delivered again
    pub requeue_delay: Duration,
    /// Restrict the ServiceBinding watch to a single namespace
    pub watch_namespace: Option<String>,
    pub discovery_refresh: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_concurrent_reconciles: 1,
            requeue_delay: Duration::from_secs(10),
            watch_namespace: None,
            discovery_refresh: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let max_concurrent_reconciles = match lookup("MAX_CONCURRENT_RECONCILES") {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("MAX_CONCURRENT_RECONCILES is not a number: {v}"))?,
            None => defaults.max_concurrent_reconciles,
        };
        if max_concurrent_reconciles == 0 {
            bail!("MAX_CONCURRENT_RECONCILES must be at least 1");
        }

        let requeue_delay = match lookup("REQUEUE_DELAY_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("REQUEUE_DELAY_SECS is not a number: {v}"))?,
            ),
            None => defaults.requeue_delay,
        };

        let discovery_refresh = match lookup("DISCOVERY_REFRESH_SECS") {
            Some(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("DISCOVERY_REFRESH_SECS is not a number: {v}"))?,
            ),
            None => defaults.discovery_refresh,
        };

        let watch_namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        Ok(Config {
            max_concurrent_reconciles,
            requeue_delay,
            watch_namespace,
            discovery_refresh,
        })
    }
}
