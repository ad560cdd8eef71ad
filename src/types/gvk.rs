// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::api::GroupVersionKind;
use std::fmt;

/// Group, version and plural resource name
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl Gvr {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Gvr {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for Gvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Resource={}", self.api_version(), self.resource)
    }
}

/// Anything that names a resource type by kind, by resource, or both
pub trait Referable {
    fn gvk(&self) -> Option<GroupVersionKind>;
    fn gvr(&self) -> Option<Gvr>;
}

/// Split an `apiVersion` into group and version
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            parse_api_version("apps/v1"),
            ("apps".to_string(), "v1".to_string())
        );
        assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
    }

    #[test]
    fn test_core_group_api_version() {
        assert_eq!(Gvr::new("", "v1", "secrets").api_version(), "v1");
        assert_eq!(
            Gvr::new("serving.knative.dev", "v1", "services").to_string(),
            "serving.knative.dev/v1, Resource=services"
        );
    }
}
