// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Generic object access over arbitrary resource types.

use crate::constants::OPERATOR_NAME;
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{DynamicObject, ListParams, Patch, PatchParams, PostParams};
use kube::discovery::ApiResource;
use kube::{Api, Client};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Get/list/update access to resources handled as untyped trees.
///
/// An empty namespace addresses cluster scoped resources. Updates carry the
/// object's `metadata.resourceVersion` and fail with [`Error::Conflict`]
/// when it is stale.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<Value>;

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>>;

    async fn create(&self, resource: &ApiResource, namespace: &str, object: &Value)
        -> Result<Value>;

    async fn update(&self, resource: &ApiResource, namespace: &str, object: &Value)
        -> Result<Value>;

    async fn update_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        if namespace.is_empty() {
            Api::all_with(self.client.clone(), resource)
        } else {
            Api::namespaced_with(self.client.clone(), namespace, resource)
        }
    }
}

/// Translate API status codes into the operator's error kinds.
fn map_api_error(err: kube::Error, resource: &ApiResource, name: &str) -> Error {
    match err {
        kube::Error::Api(ref status) if status.code == 404 => Error::NotFound {
            resource: resource.plural.clone(),
            name: name.to_string(),
        },
        kube::Error::Api(ref status) if status.code == 409 => Error::Conflict {
            resource: resource.plural.clone(),
            name: name.to_string(),
            message: status.message.clone(),
        },
        other => Error::KubeError(other),
    }
}

/// List items come back without type information, restore it.
fn to_tree(object: DynamicObject, resource: &ApiResource) -> Result<Value> {
    let mut value = serde_json::to_value(object)?;
    if let Some(map) = value.as_object_mut() {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(resource.api_version.clone()));
        map.entry("kind")
            .or_insert_with(|| Value::String(resource.kind.clone()));
    }
    Ok(value)
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self, resource), fields(kind = %resource.kind))]
    async fn get(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<Value> {
        let object = self
            .api(resource, namespace)
            .get(name)
            .await
            .map_err(|e| map_api_error(e, resource, name))?;
        to_tree(object, resource)
    }

    #[instrument(skip(self, resource), fields(kind = %resource.kind))]
    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.api(resource, namespace).list(&params).await?;
        debug!("Listed {} {}", list.items.len(), resource.plural);
        list.items
            .into_iter()
            .map(|object| to_tree(object, resource))
            .collect()
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        let object: DynamicObject = serde_json::from_value(object.clone())?;
        let name = object.metadata.name.clone().unwrap_or_default();
        let created = self
            .api(resource, namespace)
            .create(&PostParams::default(), &object)
            .await
            .map_err(|e| map_api_error(e, resource, &name))?;
        to_tree(created, resource)
    }

    async fn update(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        let object: DynamicObject = serde_json::from_value(object.clone())?;
        let name = object.metadata.name.clone().unwrap_or_default();
        let updated = self
            .api(resource, namespace)
            .replace(&name, &PostParams::default(), &object)
            .await
            .map_err(|e| map_api_error(e, resource, &name))?;
        to_tree(updated, resource)
    }

    async fn update_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        let name = object_name(object).to_string();
        let patch = json!({
            "metadata": { "resourceVersion": object["metadata"]["resourceVersion"] },
            "status": object.get("status").cloned().unwrap_or(Value::Null),
        });
        let updated = self
            .api(resource, namespace)
            .patch_status(&name, &PatchParams::apply(OPERATOR_NAME), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_api_error(e, resource, &name))?;
        to_tree(updated, resource)
    }
}

pub fn object_name(object: &Value) -> &str {
    object["metadata"]["name"].as_str().unwrap_or_default()
}

pub fn object_namespace(object: &Value) -> &str {
    object["metadata"]["namespace"].as_str().unwrap_or_default()
}

pub fn object_uid(object: &Value) -> Option<&str> {
    object["metadata"]["uid"].as_str()
}

pub fn object_kind(object: &Value) -> &str {
    object["kind"].as_str().unwrap_or_default()
}

pub fn object_api_version(object: &Value) -> &str {
    object["apiVersion"].as_str().unwrap_or_default()
}

pub fn object_labels(object: &Value) -> BTreeMap<String, String> {
    string_map(&object["metadata"]["labels"])
}

pub fn object_annotations(object: &Value) -> BTreeMap<String, String> {
    string_map(&object["metadata"]["annotations"])
}

/// Owner reference uids of an object
pub fn owner_uids(object: &Value) -> Vec<&str> {
    object["metadata"]["ownerReferences"]
        .as_array()
        .map(|refs| refs.iter().filter_map(|r| r["uid"].as_str()).collect())
        .unwrap_or_default()
}

fn string_map(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}
