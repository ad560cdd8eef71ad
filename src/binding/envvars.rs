// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Flattening of nested values into environment-style keys.

use serde_json::Value;
use std::collections::BTreeMap;

/// Flatten `value` into `prefix_key_subkey` entries.
///
/// Map keys and list indices become key segments; empty segments are
/// skipped. Scalars are rendered without JSON quoting and `null` as an empty
/// string.
pub fn flatten(prefix: &[&str], value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let mut path: Vec<String> = prefix.iter().map(|s| s.to_string()).collect();
    walk(&mut path, value, &mut out);
    out
}

fn walk(path: &mut Vec<String>, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                walk(path, child, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(index.to_string());
                walk(path, child, out);
                path.pop();
            }
        }
        scalar => {
            let key = path
                .iter()
                .filter(|s| !s.is_empty())
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join("_");
            out.insert(key, scalar_to_string(scalar));
        }
    }
}

pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_maps_and_lists() {
        let value = json!({
            "host": "10.0.0.7",
            "port": 5432,
            "tls": {"enabled": true},
            "urls": ["a", "b"],
            "empty": null
        });
        let flat = flatten(&["db"], &value);

        assert_eq!(flat.get("db_host").map(String::as_str), Some("10.0.0.7"));
        assert_eq!(flat.get("db_port").map(String::as_str), Some("5432"));
        assert_eq!(flat.get("db_tls_enabled").map(String::as_str), Some("true"));
        assert_eq!(flat.get("db_urls_0").map(String::as_str), Some("a"));
        assert_eq!(flat.get("db_urls_1").map(String::as_str), Some("b"));
        assert_eq!(flat.get("db_empty").map(String::as_str), Some(""));
    }

    #[test]
    fn test_flatten_skips_empty_prefix_segments() {
        let flat = flatten(&["", "svc"], &json!({"user": "postgres"}));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["svc_user"]);

        let flat = flatten(&[], &json!({"apiKey_key": "secret"}));
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["apiKey_key"]);
    }
}
