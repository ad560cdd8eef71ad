// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Extraction handlers, one per supported annotation model.

use super::{ElementType, Model, ObjectType};
use crate::error::{Error, Result};
use crate::kubernetes::store::{object_namespace, ObjectStore};
use crate::tree::{self, JsonPath};
use base64::{engine::general_purpose::STANDARD, Engine};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::discovery::ApiResource;
use serde_json::{Map, Value};
use tracing::debug;

/// Result of applying a definition to a service object
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Fragment merged into the working copy of the service
    pub raw: Value,
    /// Fragment merged into the extracted value tree
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    String {
        output_name: String,
        path: JsonPath,
    },
    StringFromDataField {
        output_name: String,
        path: JsonPath,
        object_type: ObjectType,
        source_key: String,
    },
    MapFromDataField {
        output_name: String,
        path: JsonPath,
        object_type: ObjectType,
        source_value: Option<String>,
    },
    StringOfMap {
        output_name: String,
        path: JsonPath,
    },
    SliceOfMaps {
        output_name: String,
        path: JsonPath,
        source_key: String,
        source_value: String,
    },
    SliceOfStrings {
        output_name: String,
        path: JsonPath,
        source_value: Option<String>,
    },
}

impl Definition {
    pub(super) fn from_model(
        name: &str,
        value: &str,
        output_name: String,
        model: Model,
    ) -> Result<Self> {
        let Model {
            path,
            object_type,
            source_key,
            source_value,
            element_type,
        } = model;

        let definition = match (element_type, object_type) {
            (ElementType::String, None) => Definition::String { output_name, path },
            (ElementType::String, Some(object_type)) => match source_key.or(source_value) {
                Some(source_key) => Definition::StringFromDataField {
                    output_name,
                    path,
                    object_type,
                    source_key,
                },
                None => return Err(handler_not_found(name, value)),
            },
            (ElementType::Map, Some(object_type)) => Definition::MapFromDataField {
                output_name,
                path,
                object_type,
                source_value,
            },
            (ElementType::Map, None) => Definition::StringOfMap { output_name, path },
            (ElementType::SliceOfMaps, _) => match (source_key, source_value) {
                (Some(source_key), Some(source_value)) => Definition::SliceOfMaps {
                    output_name,
                    path,
                    source_key,
                    source_value,
                },
                _ => return Err(handler_not_found(name, value)),
            },
            (ElementType::SliceOfStrings, _) => Definition::SliceOfStrings {
                output_name,
                path,
                source_value,
            },
        };
        Ok(definition)
    }

    pub fn output_name(&self) -> &str {
        match self {
            Definition::String { output_name, .. }
            | Definition::StringFromDataField { output_name, .. }
            | Definition::MapFromDataField { output_name, .. }
            | Definition::StringOfMap { output_name, .. }
            | Definition::SliceOfMaps { output_name, .. }
            | Definition::SliceOfStrings { output_name, .. } => output_name,
        }
    }

    fn path(&self) -> &JsonPath {
        match self {
            Definition::String { path, .. }
            | Definition::StringFromDataField { path, .. }
            | Definition::MapFromDataField { path, .. }
            | Definition::StringOfMap { path, .. }
            | Definition::SliceOfMaps { path, .. }
            | Definition::SliceOfStrings { path, .. } => path,
        }
    }

    /// Extract this definition's value from `service`.
    pub async fn apply(&self, service: &Value, store: &dyn ObjectStore) -> Result<Extraction> {
        let path = self.path();
        let found = path.get_required(service)?;
        let out = self.output_name().to_string();

        let extracted = match self {
            Definition::String { .. } => scalar(found, path)?,
            Definition::StringFromDataField {
                object_type,
                source_key,
                ..
            } => {
                let entries = fetch_data_field(store, service, found, path, *object_type).await?;
                let value = entries
                    .get(source_key)
                    .cloned()
                    .ok_or_else(|| Error::shape(format!("{path}.{source_key}"), "key not found"))?;
                return Ok(Extraction {
                    raw: raw_sibling(path, &out, value.clone()),
                    data: single(&out, value),
                });
            }
            Definition::MapFromDataField {
                object_type,
                source_value,
                ..
            } => {
                let entries = fetch_data_field(store, service, found, path, *object_type).await?;
                let data = match source_value {
                    Some(key) => {
                        let value = entries.get(key).cloned().ok_or_else(|| {
                            Error::shape(format!("{path}.{key}"), "key not found")
                        })?;
                        single(&out, value)
                    }
                    None => Value::Object(entries.clone()),
                };
                let raw_value = match source_value {
                    Some(_) => data.clone(),
                    None => Value::Object(entries),
                };
                let raw = match path.fields() {
                    Some(fields) => tree::nested(&fields, raw_value),
                    None => Value::Object(Map::new()),
                };
                return Ok(Extraction { raw, data });
            }
            Definition::StringOfMap { .. } => {
                if !found.is_object() {
                    return Err(Error::shape(path.to_string(), "expected a map"));
                }
                found.clone()
            }
            Definition::SliceOfMaps {
                source_key,
                source_value,
                ..
            } => {
                let mut map = Map::new();
                for item in list(found, path)? {
                    let key = item.get(source_key).and_then(Value::as_str).ok_or_else(|| {
                        Error::shape(format!("{path}[].{source_key}"), "expected a string")
                    })?;
                    let value = item.get(source_value).cloned().unwrap_or(Value::Null);
                    map.insert(key.to_string(), value);
                }
                Value::Object(map)
            }
            Definition::SliceOfStrings { source_value, .. } => {
                let mut values = Vec::new();
                for item in list(found, path)? {
                    let value = match source_value {
                        Some(key) => item.get(key).cloned().unwrap_or(Value::Null),
                        None => scalar(item, path)?,
                    };
                    values.push(value);
                }
                Value::Array(values)
            }
        };

        Ok(Extraction {
            raw: raw_sibling(path, &out, extracted.clone()),
            data: single(&out, extracted),
        })
    }
}

fn handler_not_found(name: &str, value: &str) -> Error {
    Error::HandlerNotFound {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

/// `value` placed next to the source field under the output name
fn raw_sibling(path: &JsonPath, output_name: &str, value: Value) -> Value {
    match path.fields() {
        Some(mut fields) => {
            fields.pop();
            fields.push(output_name.to_string());
            tree::nested(&fields, value)
        }
        None => Value::Object(Map::new()),
    }
}

fn scalar(value: &Value, path: &JsonPath) -> Result<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => {
            Err(Error::shape(path.to_string(), "expected a scalar value"))
        }
        other => Ok(other.clone()),
    }
}

fn list<'a>(value: &'a Value, path: &JsonPath) -> Result<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| Error::shape(path.to_string(), "expected a list"))
}

/// Read all entries of the Secret or ConfigMap named by `reference`.
async fn fetch_data_field(
    store: &dyn ObjectStore,
    service: &Value,
    reference: &Value,
    path: &JsonPath,
    object_type: ObjectType,
) -> Result<Map<String, Value>> {
    let name = reference
        .as_str()
        .ok_or_else(|| Error::shape(path.to_string(), "expected an object name"))?;
    let namespace = object_namespace(service);
    debug!("Reading {:?} {}/{}", object_type, namespace, name);

    let (resource, decode) = match object_type {
        ObjectType::Secret => (ApiResource::erase::<Secret>(&()), true),
        ObjectType::ConfigMap => (ApiResource::erase::<ConfigMap>(&()), false),
    };
    let object = store.get(&resource, namespace, name).await?;
    data_entries(&object, decode)
}

/// Entries of a Secret (`decode`) or ConfigMap `data` field as strings
pub fn data_entries(object: &Value, decode: bool) -> Result<Map<String, Value>> {
    let mut entries = Map::new();
    let Some(data) = object.get("data").and_then(Value::as_object) else {
        return Ok(entries);
    };
    for (key, value) in data {
        let raw = value.as_str().unwrap_or_default();
        let text = if decode {
            let bytes = STANDARD
                .decode(raw)
                .map_err(|e| Error::shape(format!("data.{key}"), e.to_string()))?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            raw.to_string()
        };
        entries.insert(key.clone(), Value::String(text));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::super::build_definition;
    use super::*;
    use crate::test_utils::{config_maps, secrets, InMemoryStore};
    use serde_json::json;

    fn service(status: Value) -> Value {
        json!({"metadata": {"name": "db", "namespace": "the-namespace"}, "status": status})
    }

    async fn apply(name: &str, value: &str, service: &Value, store: &InMemoryStore) -> Extraction {
        build_definition(name, value)
            .unwrap()
            .apply(service, store)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_string_from_path() {
        let store = InMemoryStore::new();
        let svc = service(json!({"dbCredentials": {"password": "hunter2"}}));
        let got = apply("service.binding/password", "path={.status.dbCredentials.password}", &svc, &store).await;

        assert_eq!(got.data, json!({"password": "hunter2"}));
        assert_eq!(got.raw, json!({"status": {"dbCredentials": {"password": "hunter2"}}}));
    }

    #[tokio::test]
    async fn test_single_entry_from_secret() {
        let store = InMemoryStore::new();
        store.insert(
            &secrets(),
            json!({
                "metadata": {"name": "creds", "namespace": "the-namespace"},
                "data": {"username": "QXp1cmVEaWFtb25k", "password": "aHVudGVyMg=="}
            }),
        );
        let svc = service(json!({"dbCredentials": "creds"}));
        let got = apply(
            "service.binding/password",
            "path={.status.dbCredentials},objectType=Secret,sourceValue=password",
            &svc,
            &store,
        )
        .await;

        assert_eq!(got.data, json!({"password": "hunter2"}));
        assert_eq!(got.raw, json!({"status": {"dbCredentials": {"password": "hunter2"}}}));
    }

    #[tokio::test]
    async fn test_all_entries_from_config_map() {
        let store = InMemoryStore::new();
        store.insert(
            &config_maps(),
            json!({
                "metadata": {"name": "creds", "namespace": "the-namespace"},
                "data": {"username": "AzureDiamond", "password": "hunter2"}
            }),
        );
        let svc = service(json!({"dbCredentials": "creds"}));
        let got = apply(
            "service.binding",
            "path={.status.dbCredentials},objectType=ConfigMap,elementType=map",
            &svc,
            &store,
        )
        .await;

        assert_eq!(got.data, json!({"username": "AzureDiamond", "password": "hunter2"}));
        assert_eq!(
            got.raw,
            json!({"status": {"dbCredentials": {"username": "AzureDiamond", "password": "hunter2"}}})
        );
    }

    #[tokio::test]
    async fn test_missing_referenced_secret_errors() {
        let store = InMemoryStore::new();
        let svc = service(json!({"dbCredentials": "absent"}));
        let err = build_definition("service.binding", "path={.status.dbCredentials},objectType=Secret")
            .unwrap()
            .apply(&svc, &store)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_slice_of_maps() {
        let store = InMemoryStore::new();
        let svc = service(json!({"bootstrap": [
            {"type": "https", "url": "secure.example.com"},
            {"type": "http", "url": "www.example.com"}
        ]}));
        let got = apply(
            "service.binding/urls",
            "path={.status.bootstrap},elementType=sliceOfMaps,sourceKey=type,sourceValue=url",
            &svc,
            &store,
        )
        .await;

        let expected = json!({"https": "secure.example.com", "http": "www.example.com"});
        assert_eq!(got.data, json!({"urls": expected.clone()}));
        assert_eq!(got.raw, json!({"status": {"urls": expected}}));
    }

    #[tokio::test]
    async fn test_slice_of_strings() {
        let store = InMemoryStore::new();
        let svc = service(json!({"bootstrap": [
            {"type": "https", "url": "secure.example.com"},
            {"type": "http", "url": "www.example.com"}
        ]}));
        let got = apply(
            "service.binding",
            "path={.status.bootstrap},elementType=sliceOfStrings,sourceValue=url",
            &svc,
            &store,
        )
        .await;

        assert_eq!(got.data, json!({"bootstrap": ["secure.example.com", "www.example.com"]}));
    }

    #[tokio::test]
    async fn test_map_without_object_type() {
        let store = InMemoryStore::new();
        let svc = service(json!({"endpoints": {"primary": "a", "replica": "b"}}));
        let got = apply("service.binding/endpoints", "path={.status.endpoints},elementType=map", &svc, &store).await;
        assert_eq!(got.data, json!({"endpoints": {"primary": "a", "replica": "b"}}));
    }

    #[tokio::test]
    async fn test_missing_path_is_shape_mismatch() {
        let store = InMemoryStore::new();
        let svc = service(json!({}));
        let err = build_definition("service.binding/password", "path={.status.password}")
            .unwrap()
            .apply(&svc, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_slice_of_maps_requires_keys() {
        let err = build_definition("service.binding/urls", "path={.status.bootstrap},elementType=sliceOfMaps").unwrap_err();
        assert!(err.is_skippable_annotation());
    }
}
