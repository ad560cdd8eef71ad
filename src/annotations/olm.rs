// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Binding annotations derived from OLM ClusterServiceVersion descriptors.

use crate::constants::annotations::BINDING_PREFIX;
use crate::error::{ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::ObjectStore;
use kube::api::GroupVersionKind;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const DESCRIPTOR_SECRET: &str = "urn:alm:descriptor:io.kubernetes:Secret";
const DESCRIPTOR_CONFIG_MAP: &str = "urn:alm:descriptor:io.kubernetes:ConfigMap";

/// Annotations for every descriptor of `kind`/`version` owned by `csv`.
pub fn descriptor_annotations(csv: &Value, kind: &str, version: &str) -> BTreeMap<String, String> {
    let mut annotations = BTreeMap::new();
    let owned = csv["spec"]["customresourcedefinitions"]["owned"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|crd| crd["kind"] == kind && crd["version"] == version);

    for crd in owned {
        for (root, field) in [("spec", "specDescriptors"), ("status", "statusDescriptors")] {
            for descriptor in crd[field].as_array().into_iter().flatten() {
                if let Some((name, value)) = descriptor_annotation(root, descriptor) {
                    annotations.insert(name, value);
                }
            }
        }
    }
    annotations
}

fn descriptor_annotation(root: &str, descriptor: &Value) -> Option<(String, String)> {
    let path = descriptor["path"].as_str()?;
    let x_descriptors: Vec<&str> = descriptor["x-descriptors"]
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .collect();

    let binding = x_descriptors
        .iter()
        .find(|xd| xd.starts_with(BINDING_PREFIX))?;
    let mut parts = binding.splitn(3, ':').skip(1);
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .or_else(|| path.rsplit('.').next())?;
    let source_key = parts.next().filter(|k| !k.is_empty());

    let object_type = x_descriptors.iter().find_map(|xd| match *xd {
        DESCRIPTOR_SECRET => Some("Secret"),
        DESCRIPTOR_CONFIG_MAP => Some("ConfigMap"),
        _ => None,
    });

    let mut value = format!("path={{.{root}.{path}}}");
    if let Some(object_type) = object_type {
        value.push_str(&format!(",objectType={object_type}"));
        match source_key {
            Some(key) => value.push_str(&format!(",sourceValue={key}")),
            None => value.push_str(",elementType=map"),
        }
    }

    Some((format!("{BINDING_PREFIX}/{name}"), value))
}

/// Descriptor annotations from the CSVs in `namespace` for `gvk`.
///
/// A cluster without OLM yields no annotations.
pub async fn csv_annotations(
    store: &dyn ObjectStore,
    lookup: &dyn TypeLookup,
    namespace: &str,
    gvk: &GroupVersionKind,
) -> Result<BTreeMap<String, String>> {
    let csv_gvk = GroupVersionKind::gvk("operators.coreos.com", "v1alpha1", "ClusterServiceVersion");
    let resource = match lookup.resource_for_kind(&csv_gvk).await {
        Ok(resource) => resource,
        Err(e) if e.kind() == ErrorKind::UnknownResource => {
            debug!("ClusterServiceVersion type not served, skipping descriptors");
            return Ok(BTreeMap::new());
        }
        Err(e) => return Err(e),
    };

    let mut annotations = BTreeMap::new();
    for csv in store.list(&resource, namespace, None).await? {
        annotations.extend(descriptor_annotations(&csv, &gvk.kind, &gvk.version));
    }
    Ok(annotations)
}
