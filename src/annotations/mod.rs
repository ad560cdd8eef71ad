// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Binding annotation protocol.
//!
//! A backing service marks the fields that contribute binding data with
//! annotations such as
//!
//! ```text
//! service.binding/username: path={.spec.user}
//! service.binding: path={.status.credentials},objectType=Secret
//! ```
//!
//! The key selects the output name, the value describes where the data lives
//! and how it is shaped.

pub mod definition;
pub mod olm;

use crate::constants::annotations::BINDING_PREFIX;
use crate::error::{Error, Result};
use crate::tree::JsonPath;

pub use definition::{Definition, Extraction};

/// Kind of object a field value points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Secret,
    ConfigMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    String,
    Map,
    SliceOfMaps,
    SliceOfStrings,
}

/// Parsed annotation value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub path: JsonPath,
    pub object_type: Option<ObjectType>,
    pub source_key: Option<String>,
    pub source_value: Option<String>,
    pub element_type: ElementType,
}

/// Whether an annotation key belongs to the binding protocol
pub fn is_binding_annotation(name: &str) -> bool {
    name == BINDING_PREFIX
        || name
            .strip_prefix(BINDING_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Output name encoded in the key, `None` for the bare prefix
fn output_name(name: &str) -> Result<Option<String>> {
    if !is_binding_annotation(name) {
        return Err(Error::InvalidAnnotationPrefix(name.to_string()));
    }
    Ok(name
        .split_once('/')
        .map(|(_, suffix)| suffix.to_string())
        .filter(|suffix| !suffix.is_empty()))
}

impl Model {
    pub fn parse(name: &str, value: &str) -> Result<Self> {
        let mut path = None;
        let mut object_type = None;
        let mut source_key = None;
        let mut source_value = None;
        let mut element_type = None;

        for pair in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, val) = pair.split_once('=').ok_or_else(|| Error::HandlerNotFound {
                name: name.to_string(),
                value: value.to_string(),
            })?;
            let val = val.trim().to_string();
            match key.trim() {
                "path" => path = Some(JsonPath::parse(&val)?),
                "objectType" => {
                    object_type = Some(match val.as_str() {
                        "Secret" => ObjectType::Secret,
                        "ConfigMap" => ObjectType::ConfigMap,
                        _ => return Err(unhandled(name, value)),
                    })
                }
                "sourceKey" => source_key = Some(val),
                "sourceValue" => source_value = Some(val),
                "elementType" => {
                    element_type = Some(match val.as_str() {
                        "string" => ElementType::String,
                        "map" => ElementType::Map,
                        "sliceOfMaps" => ElementType::SliceOfMaps,
                        "sliceOfStrings" => ElementType::SliceOfStrings,
                        _ => return Err(unhandled(name, value)),
                    })
                }
                _ => return Err(unhandled(name, value)),
            }
        }

        let path = path.ok_or_else(|| Error::InvalidPath(value.to_string()))?;
        let element_type = element_type.unwrap_or(if object_type.is_some() {
            ElementType::Map
        } else {
            ElementType::String
        });

        Ok(Model {
            path,
            object_type,
            source_key,
            source_value,
            element_type,
        })
    }
}

fn unhandled(name: &str, value: &str) -> Error {
    Error::HandlerNotFound {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Build the extraction definition for one annotation.
pub fn build_definition(name: &str, value: &str) -> Result<Definition> {
    let explicit_name = output_name(name)?;
    let model = Model::parse(name, value)?;
    let output_name = match explicit_name {
        Some(n) => n,
        None => model
            .path
            .last_field()
            .map(str::to_string)
            .ok_or_else(|| Error::EmptyAnnotationName(name.to_string()))?,
    };
    Definition::from_model(name, value, output_name, model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binding_annotation() {
        assert!(is_binding_annotation("service.binding"));
        assert!(is_binding_annotation("service.binding/password"));
        assert!(!is_binding_annotation("service.bindings/password"));
        assert!(!is_binding_annotation("kubectl.kubernetes.io/last-applied-configuration"));
    }

    #[test]
    fn test_model_defaults() {
        let model = Model::parse("service.binding", "path={.status.credentials},objectType=Secret").unwrap();
        assert_eq!(model.object_type, Some(ObjectType::Secret));
        assert_eq!(model.element_type, ElementType::Map);

        let model = Model::parse("service.binding/user", "path={.spec.user}").unwrap();
        assert_eq!(model.object_type, None);
        assert_eq!(model.element_type, ElementType::String);
    }

    #[test]
    fn test_model_all_fields() {
        let model = Model::parse(
            "service.binding/urls",
            "path={.status.bootstrap}, elementType=sliceOfMaps, sourceKey=type, sourceValue=url",
        )
        .unwrap();
        assert_eq!(model.element_type, ElementType::SliceOfMaps);
        assert_eq!(model.source_key.as_deref(), Some("type"));
        assert_eq!(model.source_value.as_deref(), Some("url"));
    }

    #[test]
    fn test_invalid_path_is_not_skippable() {
        let err = Model::parse("service.binding/user", "path=.spec.user").unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
        assert!(!err.is_skippable_annotation());
    }

    #[test]
    fn test_unknown_element_type_is_skippable() {
        let err = Model::parse("service.binding/x", "path={.spec.x},elementType=tuple").unwrap_err();
        assert!(err.is_skippable_annotation());
    }

    #[test]
    fn test_output_name_defaults_to_last_path_segment() {
        let definition = build_definition("service.binding", "path={.status.dbCredentials.password}").unwrap();
        assert_eq!(definition.output_name(), "password");

        let definition = build_definition("service.binding/", "path={.spec.user}").unwrap();
        assert_eq!(definition.output_name(), "user");
    }

    #[test]
    fn test_wrong_prefix_is_skippable() {
        let err = build_definition("example.com/binding", "path={.spec.user}").unwrap_err();
        assert!(matches!(err, Error::InvalidAnnotationPrefix(_)));
        assert!(err.is_skippable_annotation());
    }
}
