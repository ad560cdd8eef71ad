// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resources owned by a backing service that contribute binding data.

use crate::annotations::definition::data_entries;
use crate::error::{ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::{object_kind, owner_uids, ObjectStore};
use kube::api::GroupVersionKind;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Kinds scanned for owned resources
fn owned_kinds() -> [GroupVersionKind; 4] {
    [
        GroupVersionKind::gvk("", "v1", "ConfigMap"),
        GroupVersionKind::gvk("", "v1", "Secret"),
        GroupVersionKind::gvk("", "v1", "Service"),
        GroupVersionKind::gvk("route.openshift.io", "v1", "Route"),
    ]
}

/// List the objects in `namespace` whose owner references point at `owner_uid`.
pub async fn owned_resources(
    store: &dyn ObjectStore,
    lookup: &dyn TypeLookup,
    namespace: &str,
    owner_uid: &str,
) -> Result<Vec<Value>> {
    let mut owned = Vec::new();
    for gvk in owned_kinds() {
        let resource = match lookup.resource_for_kind(&gvk).await {
            Ok(resource) => resource,
            Err(e) if e.kind() == ErrorKind::UnknownResource => {
                debug!("{} not served, skipping", gvk.kind);
                continue;
            }
            Err(e) => return Err(e),
        };
        owned.extend(
            store
                .list(&resource, namespace, None)
                .await?
                .into_iter()
                .filter(|o| owner_uids(o).contains(&owner_uid)),
        );
    }
    Ok(owned)
}

/// Values of an owned object that are exposed as binding data.
pub fn bindable_values(object: &Value) -> Result<Value> {
    let values = match object_kind(object) {
        "ConfigMap" => Value::Object(data_entries(object, false)?),
        "Secret" => Value::Object(data_entries(object, true)?),
        "Service" => match object["spec"]["clusterIP"].as_str() {
            Some(ip) => json!({ "clusterIP": ip }),
            None => Value::Object(Map::new()),
        },
        "Route" => match object["spec"]["host"].as_str() {
            Some(host) => json!({ "host": host }),
            None => Value::Object(Map::new()),
        },
        _ => Value::Object(Map::new()),
    };
    Ok(values)
}
