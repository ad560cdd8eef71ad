// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Extra mutations some workload kinds need before they accept an update.

use crate::error::Result;
use crate::tree;
use kube::discovery::ApiResource;
use serde_json::Value;
use tracing::info;

/// Hook run on a modified workload right before it is written back
pub type Modifier = fn(&mut Value) -> Result<()>;

/// (group, version, plural) of every workload type with a hook
const MODIFIERS: &[(&str, &str, &str, Modifier)] = &[(
    "serving.knative.dev",
    "v1",
    "services",
    remove_revision_name,
)];

pub fn modifier_for(resource: &ApiResource) -> Option<Modifier> {
    MODIFIERS
        .iter()
        .find(|(group, version, plural, _)| {
            resource.group == *group && resource.version == *version && resource.plural == *plural
        })
        .map(|(_, _, _, modifier)| *modifier)
}

/// Knative rejects a template change that keeps the previous revision name.
fn remove_revision_name(object: &mut Value) -> Result<()> {
    const PATH: [&str; 4] = ["spec", "template", "metadata", "name"];
    if let Some(revision) = tree::get_str(object, &PATH).map(str::to_string) {
        tree::remove(object, &PATH);
        info!("Removed revision {} from knative service template", revision);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deployments, knative_services};
    use serde_json::json;

    #[test]
    fn test_knative_service_drops_revision_name() {
        let modifier = modifier_for(&knative_services()).unwrap();
        let mut ksvc = json!({
            "spec": {"template": {"metadata": {"name": "app-00001", "labels": {"a": "b"}}}}
        });
        modifier(&mut ksvc).unwrap();
        assert_eq!(ksvc, json!({"spec": {"template": {"metadata": {"labels": {"a": "b"}}}}}));
    }

    #[test]
    fn test_no_modifier_for_deployments() {
        assert!(modifier_for(&deployments()).is_none());
    }
}
