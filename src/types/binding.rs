// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{DEFAULT_CONTAINERS_PATH, FINALIZER};
use crate::types::gvk::{Gvr, Referable};
use kube::api::GroupVersionKind;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declares that the application should receive the binding data of the
/// listed backing services.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "binding.operators.coreos.com",
    version = "v1alpha1",
    kind = "ServiceBinding",
    shortname = "sbr"
)]
#[kube(namespaced)]
#[kube(status = "ServiceBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    /// `none`, `uppercase`, `lowercase` or a custom naming template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<Application>,
    #[serde(default)]
    pub detect_binding_resources: bool,
    #[serde(default)]
    pub bind_as_files: bool,
}

/// A custom binding entry rendered from a template over all services
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
pub struct Mapping {
    pub name: String,
    pub value: String,
}

/// Backing service selector
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
}

/// Application selector, by name or by labels
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub group: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_path: Option<BindingPath>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<BTreeMap<String, String>>,
}

impl LabelSelector {
    /// Render as a `key=value,...` list selector
    pub fn to_selector_string(&self) -> Option<String> {
        let labels = self.match_labels.as_ref().filter(|l| !l.is_empty())?;
        Some(
            labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match &self.match_labels {
            Some(wanted) if !wanted.is_empty() => {
                wanted.iter().all(|(k, v)| labels.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

/// Overrides of where the binding is injected inside the application
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BindingPath {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containers_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_path: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBindingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<BoundApplication>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(condition_type: &str, ready: bool) -> Self {
        Condition {
            condition_type: condition_type.to_string(),
            status: if ready { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }

    pub fn reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// A workload that received the binding
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundApplication {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    pub name: String,
}

impl ServiceBinding {
    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self) -> bool {
        self.finalizers().iter().any(|f| f == FINALIZER)
    }

    /// Add the finalizer, returning whether the object changed
    pub fn add_finalizer(&mut self) -> bool {
        if self.has_finalizer() {
            return false;
        }
        self.finalizers_mut().push(FINALIZER.to_string());
        true
    }

    /// Remove the finalizer, returning whether the object changed
    pub fn remove_finalizer(&mut self) -> bool {
        if !self.has_finalizer() {
            return false;
        }
        self.finalizers_mut().retain(|f| f != FINALIZER);
        true
    }

    pub fn has_owner_references(&self) -> bool {
        !self.owner_references().is_empty()
    }

    /// The intermediary secret shares the binding's name
    pub fn secret_name(&self) -> String {
        self.name_any()
    }

    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.status
            .as_ref()?
            .conditions
            .iter()
            .find(|c| c.condition_type == condition_type)
    }
}

impl Service {
    pub fn namespace_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(default)
    }
}

impl Referable for Service {
    fn gvk(&self) -> Option<GroupVersionKind> {
        Some(GroupVersionKind::gvk(&self.group, &self.version, &self.kind))
    }

    fn gvr(&self) -> Option<Gvr> {
        None
    }
}

impl Application {
    /// Container list location, defaulted only when no binding path is given
    pub fn containers_path(&self) -> Option<String> {
        match &self.binding_path {
            None => Some(DEFAULT_CONTAINERS_PATH.to_string()),
            Some(bp) => bp.containers_path.clone().filter(|p| !p.is_empty()),
        }
    }

    pub fn secret_path(&self) -> Option<String> {
        self.binding_path
            .as_ref()
            .and_then(|bp| bp.secret_path.clone())
            .filter(|p| !p.is_empty())
    }
}

impl Referable for Application {
    fn gvk(&self) -> Option<GroupVersionKind> {
        self.kind
            .as_ref()
            .map(|kind| GroupVersionKind::gvk(&self.group, &self.version, kind))
    }

    fn gvr(&self) -> Option<Gvr> {
        self.resource
            .as_ref()
            .map(|resource| Gvr::new(&self.group, &self.version, resource))
    }
}
