// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of backing services into binding values.

use super::owned::{bindable_values, owned_resources};
use crate::annotations::{build_definition, is_binding_annotation, olm};
use crate::error::{Error, ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::{object_annotations, object_uid, ObjectStore};
use crate::tree::{merge_append, merge_override};
use crate::types::Service;
use kube::api::GroupVersionKind;
use kube::discovery::ApiResource;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// A backing service together with the values extracted from it
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceContext {
    /// Working copy of the service object, including handler rewrites
    pub service: Value,
    /// Nested extracted values
    pub values: Value,
    pub name_prefix: Option<String>,
    pub id: Option<String>,
}

impl ServiceContext {
    pub fn kind(&self) -> &str {
        self.service["kind"].as_str().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.service["metadata"]["name"].as_str().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.service["metadata"]["namespace"]
            .as_str()
            .unwrap_or_default()
    }
}

/// Builds service contexts for the services of one binding request.
pub struct ServiceContextResolver<'a> {
    store: &'a dyn ObjectStore,
    lookup: &'a dyn TypeLookup,
    namespace: &'a str,
    detect_binding_resources: bool,
}

impl<'a> ServiceContextResolver<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        lookup: &'a dyn TypeLookup,
        namespace: &'a str,
        detect_binding_resources: bool,
    ) -> Self {
        Self {
            store,
            lookup,
            namespace,
            detect_binding_resources,
        }
    }

    #[instrument(skip_all, fields(namespace = %self.namespace, services = selectors.len()))]
    pub async fn resolve(&self, selectors: &[Service]) -> Result<Vec<ServiceContext>> {
        let mut contexts = Vec::new();
        for selector in selectors {
            contexts.extend(self.resolve_one(selector).await?);
        }
        Ok(contexts)
    }

    async fn resolve_one(&self, selector: &Service) -> Result<Vec<ServiceContext>> {
        let resource = self.lookup.resource_for_referable(selector).await?;
        let namespace = selector.namespace_or(self.namespace);

        let object = self
            .store
            .get(&resource, namespace, &selector.name)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::ServiceNotFound {
                    kind: selector.kind.clone(),
                    name: selector.name.clone(),
                },
                _ => e,
            })?;

        let annotations = self.layered_annotations(selector, &resource, &object).await?;
        let context = build_context(
            self.store,
            object,
            &annotations,
            selector.name_prefix.clone(),
            selector.id.clone(),
        )
        .await?;
        debug!(kind = %selector.kind, name = %selector.name, "Resolved service context");

        let mut contexts = Vec::new();
        if self.detect_binding_resources {
            let owner_uid = object_uid(&context.service).unwrap_or_default().to_string();
            let prefix = selector
                .name_prefix
                .clone()
                .unwrap_or_else(|| selector.kind.clone());
            for owned in owned_resources(self.store, self.lookup, namespace, &owner_uid).await? {
                let values = bindable_values(&owned)?;
                contexts.push(ServiceContext {
                    service: owned,
                    values,
                    name_prefix: Some(prefix.clone()),
                    id: None,
                });
            }
        }
        contexts.insert(0, context);
        Ok(contexts)
    }

    /// Descriptor annotations, overridden by CRD annotations, overridden by
    /// the object's own annotations.
    async fn layered_annotations(
        &self,
        selector: &Service,
        resource: &ApiResource,
        object: &Value,
    ) -> Result<BTreeMap<String, String>> {
        let gvk = GroupVersionKind::gvk(&selector.group, &selector.version, &selector.kind);
        let namespace = selector.namespace_or(self.namespace);

        let mut annotations = olm::csv_annotations(self.store, self.lookup, namespace, &gvk).await?;
        annotations.extend(self.crd_annotations(resource).await?);
        annotations.extend(object_annotations(object));
        Ok(annotations)
    }

    async fn crd_annotations(&self, resource: &ApiResource) -> Result<BTreeMap<String, String>> {
        if resource.group.is_empty() {
            return Ok(BTreeMap::new());
        }
        let crd_gvk = GroupVersionKind::gvk("apiextensions.k8s.io", "v1", "CustomResourceDefinition");
        let crd_resource = match self.lookup.resource_for_kind(&crd_gvk).await {
            Ok(r) => r,
            Err(e) if e.kind() == ErrorKind::UnknownResource => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };
        let crd_name = format!("{}.{}", resource.plural, resource.group);
        match self.store.get(&crd_resource, "", &crd_name).await {
            Ok(crd) => Ok(object_annotations(&crd)),
            Err(e) if e.is_not_found() => Ok(BTreeMap::new()),
            Err(e) => Err(e),
        }
    }
}

/// Run the annotation protocol over `object`, in key order.
pub async fn build_context(
    store: &dyn ObjectStore,
    object: Value,
    annotations: &BTreeMap<String, String>,
    name_prefix: Option<String>,
    id: Option<String>,
) -> Result<ServiceContext> {
    let mut service = object.clone();
    let mut values = Value::Object(Map::new());

    for (name, value) in annotations {
        if !is_binding_annotation(name) {
            continue;
        }
        let extraction = match build_definition(name, value) {
            Ok(definition) => definition.apply(&object, store).await?,
            Err(e) if e.is_skippable_annotation() => {
                warn!("Skipping annotation {}: {}", name, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        merge_override(&mut service, extraction.raw);
        merge_append(&mut values, extraction.data);
    }

    Ok(ServiceContext {
        service,
        values,
        name_prefix,
        id,
    })
}
