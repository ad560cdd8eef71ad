// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Assembly of the binding secret payload.

use super::envvars::flatten;
use super::naming::{NamingStrategy, ServiceRef};
use super::template::TemplateEngine;
use crate::error::{Error, Result};
use crate::service::ServiceContext;
use crate::tree;
use crate::types::gvk::parse_api_version;
use crate::types::Mapping;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

pub type BindingData = BTreeMap<String, Vec<u8>>;

/// Flatten and name the values of every context, then render the mappings.
pub fn aggregate(
    name_prefix: Option<&str>,
    contexts: &[ServiceContext],
    mappings: &[Mapping],
    naming: &NamingStrategy,
) -> Result<BindingData> {
    let mut data = BindingData::new();

    for context in contexts {
        let prefix: Vec<&str> = [name_prefix, context.name_prefix.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        let service = ServiceRef {
            kind: context.kind(),
            name: context.name(),
            namespace: context.namespace(),
        };
        for (key, value) in flatten(&prefix, &context.values) {
            let name = naming.apply(&key, service)?;
            data.insert(name, value.into_bytes());
        }
    }

    if !mappings.is_empty() {
        let view = composite_view(contexts);
        let engine = TemplateEngine::lenient();
        for mapping in mappings {
            let rendered = engine.render(&mapping.value, &view).map_err(|e| {
                Error::MappingTemplate {
                    name: mapping.name.clone(),
                    message: e.to_string(),
                }
            })?;
            data.insert(mapping.name.clone(), rendered.into_bytes());
        }
    }

    debug!("Aggregated {} binding entries", data.len());
    Ok(data)
}

/// All services addressable by version, group, kind and name, and by id.
///
/// Each service is reachable both with its literal coordinates and with a
/// template friendly form where dots in the group and dashes in the name
/// are replaced by underscores.
pub fn composite_view(contexts: &[ServiceContext]) -> Value {
    let mut view = Value::Object(Map::new());
    for context in contexts {
        let (group, version) = parse_api_version(
            context.service["apiVersion"].as_str().unwrap_or_default(),
        );
        let kind = context.kind().to_string();
        let name = context.name().to_string();

        let literal = [version.clone(), group.clone(), kind.clone(), name.clone()];
        let friendly = [version, group.replace('.', "_"), kind, name.replace('-', "_")];
        for path in [literal, friendly] {
            // Both forms are plain map paths, a failure means a colliding scalar.
            if tree::set(&mut view, &path, context.service.clone()).is_err() {
                debug!("Skipping colliding service path {}", path.join("."));
            }
        }
        if let Some(id) = context.id.as_deref().filter(|id| !id.is_empty()) {
            if let Some(map) = view.as_object_mut() {
                map.insert(id.to_string(), context.service.clone());
            }
        }
    }
    view
}
