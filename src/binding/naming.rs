// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Naming strategies for binding keys.

use super::template::TemplateEngine;
use crate::error::{Error, Result};
use serde_json::json;

pub const NONE: &str = "{{ .name }}";
pub const UPPERCASE: &str = "{{ .service.kind | upper }}_{{ .name | upper }}";
pub const LOWERCASE: &str = "{{ .service.kind | lower }}_{{ .name | lower }}";

/// Template for a `namingStrategy` value; unknown values are templates themselves.
pub fn template_for(strategy: Option<&str>) -> &str {
    match strategy {
        None | Some("") | Some("none") => NONE,
        Some("uppercase") => UPPERCASE,
        Some("lowercase") => LOWERCASE,
        Some(custom) => custom,
    }
}

/// The service a key belongs to, as exposed to naming templates
#[derive(Debug, Clone, Copy)]
pub struct ServiceRef<'a> {
    pub kind: &'a str,
    pub name: &'a str,
    pub namespace: &'a str,
}

pub struct NamingStrategy {
    template: String,
    engine: TemplateEngine,
}

impl NamingStrategy {
    pub fn new(strategy: Option<&str>) -> Self {
        Self {
            template: template_for(strategy).to_string(),
            engine: TemplateEngine::strict(),
        }
    }

    /// Render the final key name for `name` of `service`.
    pub fn apply(&self, name: &str, service: ServiceRef<'_>) -> Result<String> {
        let ctx = json!({
            "name": name,
            "service": {
                "kind": service.kind,
                "name": service.name,
                "namespace": service.namespace,
            }
        });
        self.engine
            .render(&self.template, &ctx)
            .map_err(|e| Error::NamingStrategy(e.to_string()))
    }
}
