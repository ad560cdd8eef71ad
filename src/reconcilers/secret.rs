// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The intermediary secret holding the binding data.

use crate::binding::BindingData;
use crate::error::Result;
use crate::kubernetes::store::ObjectStore;
use crate::types::ServiceBinding;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::discovery::ApiResource;
use kube::{Resource, ResourceExt};
use serde_json::Value;
use tracing::{debug, info, instrument};

/// Build the secret for `binding`, owned by it and named after it
pub fn build_secret(binding: &ServiceBinding, data: &BindingData) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(binding.secret_name()),
            namespace: binding.namespace(),
            owner_references: binding.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.clone(), ByteString(v.clone())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Write the binding secret, creating it when missing.
///
/// The payload is always rebuilt from scratch; an existing secret is only
/// written when its data or owner differ.
#[instrument(skip(store, binding, data), fields(secret = %binding.secret_name()))]
pub async fn create_or_update(
    store: &dyn ObjectStore,
    binding: &ServiceBinding,
    data: &BindingData,
) -> Result<Value> {
    let resource = ApiResource::erase::<Secret>(&());
    let namespace = binding.namespace().unwrap_or_default();
    let desired = serde_json::to_value(build_secret(binding, data))?;

    let mut existing = match store.get(&resource, &namespace, &binding.secret_name()).await {
        Ok(existing) => existing,
        Err(e) if e.is_not_found() => {
            info!("Creating binding secret with {} entries", data.len());
            return store.create(&resource, &namespace, &desired).await;
        }
        Err(e) => return Err(e),
    };

    let owners = &desired["metadata"]["ownerReferences"];
    if payload(&existing) == payload(&desired) && existing["metadata"]["ownerReferences"] == *owners {
        debug!("Binding secret is up to date");
        return Ok(existing);
    }

    existing["data"] = desired["data"].clone();
    existing["type"] = desired["type"].clone();
    existing["metadata"]["ownerReferences"] = owners.clone();
    info!("Updating binding secret with {} entries", data.len());
    store.update(&resource, &namespace, &existing).await
}

/// The server omits `data` for an empty secret
fn payload(secret: &Value) -> Value {
    match &secret["data"] {
        Value::Null => Value::Object(Default::default()),
        data => data.clone(),
    }
}
