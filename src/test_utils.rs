// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the API server, the object store and type discovery.

use crate::error::{Error, Result};
use crate::kubernetes::lookup::{find_by_kind, find_by_resource, TypeLookup};
use crate::kubernetes::store::{
    object_labels, object_name, object_namespace, ObjectStore,
};
use crate::sync::ResourceWatcher;
use crate::types::gvk::Gvr;
use async_trait::async_trait;
use http::{Request, Response};
use kube::api::GroupVersionKind;
use kube::client::Body;
use kube::discovery::ApiResource;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();
        responses
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let (status, body) = self
            .find_response(&method, &path)
            .unwrap_or_else(|| (404, not_found_json("resource", &path)));

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

pub fn api_resource(group: &str, version: &str, kind: &str, plural: &str) -> ApiResource {
    let api_version = if group.is_empty() {
        version.to_string()
    } else {
        format!("{group}/{version}")
    };
    ApiResource {
        group: group.to_string(),
        version: version.to_string(),
        api_version,
        kind: kind.to_string(),
        plural: plural.to_string(),
    }
}

pub fn deployments() -> ApiResource {
    api_resource("apps", "v1", "Deployment", "deployments")
}

pub fn secrets() -> ApiResource {
    api_resource("", "v1", "Secret", "secrets")
}

pub fn config_maps() -> ApiResource {
    api_resource("", "v1", "ConfigMap", "configmaps")
}

pub fn databases() -> ApiResource {
    api_resource("postgresql.example.dev", "v1alpha1", "Database", "databases")
}

pub fn service_bindings() -> ApiResource {
    api_resource(
        "binding.operators.coreos.com",
        "v1alpha1",
        "ServiceBinding",
        "servicebindings",
    )
}

pub fn knative_services() -> ApiResource {
    api_resource("serving.knative.dev", "v1", "Service", "services")
}

/// [`TypeLookup`] over a fixed resource table
pub struct StaticTypeLookup {
    resources: Vec<ApiResource>,
}

impl StaticTypeLookup {
    pub fn new() -> Self {
        Self {
            resources: Self::default_resources(),
        }
    }

    pub fn default_resources() -> Vec<ApiResource> {
        vec![
            deployments(),
            secrets(),
            config_maps(),
            api_resource("", "v1", "Service", "services"),
            api_resource("route.openshift.io", "v1", "Route", "routes"),
            api_resource(
                "apiextensions.k8s.io",
                "v1",
                "CustomResourceDefinition",
                "customresourcedefinitions",
            ),
            api_resource(
                "operators.coreos.com",
                "v1alpha1",
                "ClusterServiceVersion",
                "clusterserviceversions",
            ),
            databases(),
            service_bindings(),
            knative_services(),
        ]
    }
}

#[async_trait]
impl TypeLookup for StaticTypeLookup {
    async fn resource_for_kind(&self, gvk: &GroupVersionKind) -> Result<ApiResource> {
        find_by_kind(&self.resources, gvk)
            .cloned()
            .ok_or_else(|| Error::UnknownResource(gvk.kind.clone()))
    }

    async fn kind_for_resource(&self, gvr: &Gvr) -> Result<ApiResource> {
        find_by_resource(&self.resources, gvr)
            .cloned()
            .ok_or_else(|| Error::UnknownResource(gvr.to_string()))
    }
}

type ObjectKey = (String, String, String);

#[derive(Default)]
struct StoreState {
    objects: BTreeMap<ObjectKey, Value>,
    next_version: u64,
    next_uid: u64,
    writes: Vec<(String, String, String)>,
    lists: Vec<String>,
}

/// In-memory [`ObjectStore`] with resource versions and conflict detection.
///
/// Main resource updates keep the stored `status`, status updates only
/// replace `status`, mirroring the status subresource. Every write is
/// recorded for assertions.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

fn key(resource: &ApiResource, namespace: &str, name: &str) -> ObjectKey {
    (
        format!("{}/{}", resource.api_version, resource.plural),
        namespace.to_string(),
        name.to_string(),
    )
}

fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector
        .split(',')
        .filter(|s| !s.is_empty())
        .all(|pair| match pair.split_once('=') {
            Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
            None => false,
        })
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, filling in type, uid and resource version
    pub fn insert(&self, resource: &ApiResource, object: Value) -> Value {
        let mut state = self.state.lock().unwrap();
        let mut object = object;
        object["apiVersion"] = json!(resource.api_version);
        object["kind"] = json!(resource.kind);
        state.next_version += 1;
        object["metadata"]["resourceVersion"] = json!(state.next_version.to_string());
        if object["metadata"]["uid"].is_null() {
            state.next_uid += 1;
            object["metadata"]["uid"] = json!(format!("uid-{}", state.next_uid));
        }
        let k = key(resource, object_namespace(&object), object_name(&object));
        state.objects.insert(k, object.clone());
        object
    }

    pub fn object(&self, resource: &ApiResource, namespace: &str, name: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(&key(resource, namespace, name))
            .cloned()
    }

    /// Number of writes (create, update, status) issued against `plural`
    pub fn writes_to(&self, plural: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|(p, _, _)| p == plural)
            .count()
    }

    pub fn lists_of(&self, plural: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .lists
            .iter()
            .filter(|p| *p == plural)
            .count()
    }

    pub fn updates_to(&self, plural: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .writes
            .iter()
            .filter(|(p, op, _)| p == plural && op == "update")
            .count()
    }

    /// Store `object` after checking its resource version
    fn write(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
        op: &str,
    ) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        let name = object_name(object).to_string();
        let k = key(resource, namespace, &name);
        let Some(current) = state.objects.get(&k).cloned() else {
            return Err(Error::NotFound {
                resource: resource.plural.clone(),
                name,
            });
        };
        if let Some(version) = object["metadata"]["resourceVersion"].as_str() {
            if Some(version) != current["metadata"]["resourceVersion"].as_str() {
                return Err(Error::Conflict {
                    resource: resource.plural.clone(),
                    name,
                    message: "the object has been modified".to_string(),
                });
            }
        }

        let mut stored = if op == "status" {
            let mut merged = current.clone();
            merged["status"] = object.get("status").cloned().unwrap_or(Value::Null);
            merged
        } else {
            let mut replaced = object.clone();
            if let Some(status) = current.get("status") {
                replaced["status"] = status.clone();
            }
            replaced
        };
        state.next_version += 1;
        stored["metadata"]["resourceVersion"] = json!(state.next_version.to_string());
        state
            .writes
            .push((resource.plural.clone(), op.to_string(), name));

        let deleting = !stored["metadata"]["deletionTimestamp"].is_null();
        let finalized = stored["metadata"]["finalizers"]
            .as_array()
            .is_none_or(|f| f.is_empty());
        if deleting && finalized {
            state.objects.remove(&k);
        } else {
            state.objects.insert(k, stored.clone());
        }
        Ok(stored)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, resource: &ApiResource, namespace: &str, name: &str) -> Result<Value> {
        self.object(resource, namespace, name)
            .ok_or_else(|| Error::NotFound {
                resource: resource.plural.clone(),
                name: name.to_string(),
            })
    }

    async fn list(
        &self,
        resource: &ApiResource,
        namespace: &str,
        label_selector: Option<&str>,
    ) -> Result<Vec<Value>> {
        let prefix = format!("{}/{}", resource.api_version, resource.plural);
        let mut state = self.state.lock().unwrap();
        state.lists.push(resource.plural.clone());
        Ok(state
            .objects
            .iter()
            .filter(|((p, ns, _), _)| *p == prefix && (namespace.is_empty() || ns == namespace))
            .filter(|(_, o)| label_selector.is_none_or(|s| selector_matches(s, &object_labels(o))))
            .map(|(_, o)| o.clone())
            .collect())
    }

    async fn create(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        let name = object_name(object).to_string();
        if self.object(resource, namespace, &name).is_some() {
            return Err(Error::Conflict {
                resource: resource.plural.clone(),
                name,
                message: "already exists".to_string(),
            });
        }
        let mut object = object.clone();
        object["metadata"]["namespace"] = json!(namespace);
        let created = self.insert(resource, object);
        self.state
            .lock()
            .unwrap()
            .writes
            .push((resource.plural.clone(), "create".to_string(), name));
        Ok(created)
    }

    async fn update(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        self.write(resource, namespace, object, "update")
    }

    async fn update_status(
        &self,
        resource: &ApiResource,
        namespace: &str,
        object: &Value,
    ) -> Result<Value> {
        self.write(resource, namespace, object, "status")
    }
}

/// A Deployment with a single container
pub fn deployment_json(name: &str, namespace: &str, labels: Value) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": namespace, "labels": labels},
        "spec": {
            "template": {
                "spec": {
                    "containers": [{"name": "app", "image": "quay.io/example/app:latest"}]
                }
            }
        }
    })
}

/// A backing service exposing credentials through binding annotations
pub fn database_json(name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": "postgresql.example.dev/v1alpha1",
        "kind": "Database",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "annotations": {
                "service.binding/host": "path={.status.dbConnectionIP}",
                "service.binding/username": "path={.spec.user}"
            }
        },
        "spec": {"user": "postgres"},
        "status": {"dbConnectionIP": "10.0.0.7"}
    })
}

/// [`ResourceWatcher`] remembering the plurals it was asked to watch
#[derive(Default)]
pub struct RecordingWatcher {
    watched: Mutex<Vec<String>>,
}

impl RecordingWatcher {
    pub fn watched(&self) -> Vec<String> {
        self.watched.lock().unwrap().clone()
    }
}

impl ResourceWatcher for RecordingWatcher {
    fn add_watch(&self, resource: &ApiResource) {
        self.watched.lock().unwrap().push(resource.plural.clone());
    }
}
