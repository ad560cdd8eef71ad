// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watches feeding binding keys into the work queue.

use super::queue::{ObjectKey, WorkQueue};
use crate::constants::annotations::BINDING_REFERENCE;
use crate::error::Result;
use crate::kubernetes::store::{
    object_annotations, object_api_version, object_kind, object_labels, object_name,
    object_namespace, ObjectStore,
};
use crate::types::gvk::parse_api_version;
use crate::types::ServiceBinding;
use futures::StreamExt;
use kube::api::DynamicObject;
use kube::discovery::ApiResource;
use kube_runtime::watcher::Event;
use kube_runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use serde_json::Value;
use std::collections::HashSet;
use std::pin::pin;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Accepts resource types whose changes should trigger reconciles.
pub trait ResourceWatcher: Send + Sync {
    fn add_watch(&self, resource: &ApiResource);
}

/// Starts at most one watcher per resource type.
pub struct WatchRegistry {
    client: Client,
    store: Arc<dyn ObjectStore>,
    queue: WorkQueue,
    watched: Mutex<HashSet<String>>,
}

impl WatchRegistry {
    pub fn new(client: Client, store: Arc<dyn ObjectStore>, queue: WorkQueue) -> Self {
        Self {
            client,
            store,
            queue,
            watched: Mutex::new(HashSet::new()),
        }
    }

    fn register(&self, resource: &ApiResource) -> bool {
        let key = format!("{}/{}", resource.api_version, resource.plural);
        self.watched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key)
    }
}

impl ResourceWatcher for WatchRegistry {
    fn add_watch(&self, resource: &ApiResource) {
        if !self.register(resource) {
            return;
        }
        info!(
            "Watching {}/{} for binding changes",
            resource.api_version, resource.plural
        );
        tokio::spawn(watch_resource(
            self.client.clone(),
            self.store.clone(),
            self.queue.clone(),
            resource.clone(),
        ));
    }
}

async fn watch_resource(
    client: Client,
    store: Arc<dyn ObjectStore>,
    queue: WorkQueue,
    resource: ApiResource,
) {
    let api: Api<DynamicObject> = Api::all_with(client, &resource);
    let mut events = pin!(watcher(api, watcher::Config::default()).default_backoff());

    while let Some(event) = events.next().await {
        let object = match event {
            Ok(Event::Apply(obj) | Event::InitApply(obj) | Event::Delete(obj)) => obj,
            Ok(_) => continue,
            Err(e) => {
                warn!("Watch on {} failed: {}", resource.plural, e);
                continue;
            }
        };
        let tree = match serde_json::to_value(&object) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Unreadable {} event: {}", resource.kind, e);
                continue;
            }
        };
        match bindings_for_object(store.as_ref(), &tree).await {
            Ok(keys) => {
                for key in keys {
                    debug!("{} {} changed, enqueueing {}", resource.kind, object.name_any(), key);
                    queue.add(key);
                }
            }
            Err(e) => warn!("Failed to map {} {}: {}", resource.kind, object.name_any(), e),
        }
    }
}

/// Enqueue every binding that changes.
pub async fn watch_bindings(client: Client, queue: WorkQueue, namespace: Option<String>) {
    let api: Api<ServiceBinding> = match &namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    let mut events = pin!(watcher(api, watcher::Config::default()).default_backoff());

    while let Some(event) = events.next().await {
        match event {
            Ok(Event::Apply(binding) | Event::InitApply(binding) | Event::Delete(binding)) => {
                queue.add(ObjectKey::new(
                    &binding.namespace().unwrap_or_default(),
                    &binding.name_any(),
                ));
            }
            Ok(_) => {}
            Err(e) => warn!("ServiceBinding watch failed: {}", e),
        }
    }
}

/// Keys of the bindings that use `object`.
///
/// An explicit `namespace/name` back-reference annotation wins; otherwise the
/// bindings in the object's namespace are scanned.
pub async fn bindings_for_object(store: &dyn ObjectStore, object: &Value) -> Result<Vec<ObjectKey>> {
    if let Some(reference) = object_annotations(object).get(BINDING_REFERENCE) {
        return Ok(reference.split(',').filter_map(ObjectKey::parse).collect());
    }

    let namespace = object_namespace(object);
    if namespace.is_empty() {
        return Ok(Vec::new());
    }

    let resource = ApiResource::erase::<ServiceBinding>(&());
    let mut keys = Vec::new();
    for item in store.list(&resource, namespace, None).await? {
        let binding: ServiceBinding = match serde_json::from_value(item) {
            Ok(binding) => binding,
            Err(e) => {
                debug!("Skipping unreadable binding: {}", e);
                continue;
            }
        };
        if references(&binding, object) {
            keys.push(ObjectKey::new(namespace, &binding.name_any()));
        }
    }
    Ok(keys)
}

/// Whether `binding` selects `object` as a service or as its application.
pub fn references(binding: &ServiceBinding, object: &Value) -> bool {
    let (group, version) = parse_api_version(object_api_version(object));
    let kind = object_kind(object);
    let name = object_name(object);

    let is_service = binding.spec.services.iter().any(|s| {
        s.group == group && s.version == version && s.kind == kind && s.name == name
    });

    let is_application = binding.spec.application.as_ref().is_some_and(|app| {
        app.group == group
            && app.version == version
            && app.kind.as_deref().is_none_or(|k| k == kind)
            && match app.name.as_deref().filter(|n| !n.is_empty()) {
                Some(app_name) => app_name == name,
                None => app
                    .label_selector
                    .as_ref()
                    .is_some_and(|s| s.matches(&object_labels(object))),
            }
    });

    is_service || is_application
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{database_json, deployment_json, service_bindings, InMemoryStore};
    use serde_json::json;

    fn binding_json(name: &str, application: Value) -> Value {
        json!({
            "metadata": {"name": name, "namespace": "default"},
            "spec": {
                "services": [{
                    "group": "postgresql.example.dev",
                    "version": "v1alpha1",
                    "kind": "Database",
                    "name": "db-demo"
                }],
                "application": application
            }
        })
    }

    fn binding(application: Value) -> ServiceBinding {
        serde_json::from_value(binding_json("db-binding", application)).unwrap()
    }

    #[test]
    fn test_references_service_by_kind_and_name() {
        let sb = binding(Value::Null);
        assert!(references(&sb, &database_json("db-demo", "default")));
        assert!(!references(&sb, &database_json("db-other", "default")));
    }

    #[test]
    fn test_references_application_by_name_or_labels() {
        let app = deployment_json("app", "default", json!({"app": "web"}));

        let by_name = binding(json!({"group": "apps", "version": "v1", "resource": "deployments", "name": "app"}));
        assert!(references(&by_name, &app));

        let by_labels = binding(json!({
            "group": "apps", "version": "v1", "resource": "deployments",
            "labelSelector": {"matchLabels": {"app": "web"}}
        }));
        assert!(references(&by_labels, &app));

        let other = binding(json!({"group": "apps", "version": "v1", "kind": "StatefulSet", "name": "app"}));
        assert!(!references(&other, &app));
    }

    #[tokio::test]
    async fn test_back_reference_annotation_wins() {
        let store = InMemoryStore::new();
        let mut object = deployment_json("app", "default", json!({}));
        object["metadata"]["annotations"] = json!({BINDING_REFERENCE: "default/first,other/second"});

        let keys = bindings_for_object(&store, &object).await.unwrap();

        assert_eq!(
            keys,
            vec![ObjectKey::new("default", "first"), ObjectKey::new("other", "second")]
        );
        assert_eq!(store.lists_of("servicebindings"), 0);
    }

    #[tokio::test]
    async fn test_scan_finds_referencing_bindings() {
        let store = InMemoryStore::new();
        store.insert(&service_bindings(), binding_json("uses-db", Value::Null));
        store.insert(
            &service_bindings(),
            json!({
                "metadata": {"name": "unrelated", "namespace": "default"},
                "spec": {"services": []}
            }),
        );

        let keys = bindings_for_object(&store, &database_json("db-demo", "default"))
            .await
            .unwrap();

        assert_eq!(keys, vec![ObjectKey::new("default", "uses-db")]);
    }
}
