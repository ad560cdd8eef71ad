// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Container level edits for injecting and removing a binding.
//!
//! All helpers work on the raw `env`, `envFrom`, `volumeMounts` and
//! `volumes` lists of a pod template and leave entries that do not belong
//! to the binding untouched.

use crate::constants::DEFAULT_BINDING_ROOT;
use crate::error::Result;
use crate::tree;
use serde_json::{json, Value};

/// Compute `(mount path, binding root, fixed)` for a binding named `name`.
///
/// An existing binding root wins over the requested mount path. A fixed
/// mount path is used verbatim and needs no root variable.
pub fn mount_path(binding_root: &str, mount_path: &str, name: &str) -> (String, String, bool) {
    if !binding_root.is_empty() {
        return (join_path(binding_root, name), binding_root.to_string(), false);
    }
    if !mount_path.is_empty() {
        return (mount_path.to_string(), mount_path.to_string(), true);
    }
    (
        join_path(DEFAULT_BINDING_ROOT, name),
        DEFAULT_BINDING_ROOT.to_string(),
        false,
    )
}

fn join_path(root: &str, name: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), name)
}

/// Set `name` to `value`, overwriting an existing variable of that name.
pub fn append_env_var(env: &mut Vec<Value>, name: &str, value: &str) {
    match env.iter_mut().find(|e| e["name"] == name) {
        Some(existing) => {
            if let Some(map) = existing.as_object_mut() {
                map.remove("valueFrom");
                map.insert("value".to_string(), json!(value));
            }
        }
        None => env.push(json!({"name": name, "value": value})),
    }
}

/// Value of the variable `name`, if it is set to a literal
pub fn env_var<'a>(env: &'a [Value], name: &str) -> Option<&'a str> {
    env.iter()
        .find(|e| e["name"] == name)
        .and_then(|e| e["value"].as_str())
}

fn secret_ref_name(entry: &Value) -> Option<&str> {
    entry["secretRef"]["name"].as_str()
}

/// Make sure `env_from` references `secret` exactly once.
///
/// Secret references whose name contains `binding_name` are stale leftovers
/// of an earlier secret and are dropped. Config map references and
/// unrelated secrets are kept.
pub fn update_env_from_list(env_from: &mut Vec<Value>, secret: &str, binding_name: &str) {
    if env_from.iter().any(|e| secret_ref_name(e) == Some(secret)) {
        return;
    }
    env_from.retain(|e| !secret_ref_name(e).is_some_and(|name| name.contains(binding_name)));
    env_from.push(json!({"secretRef": {"name": secret}}));
}

pub fn remove_env_from(env_from: &mut Vec<Value>, secret: &str) {
    env_from.retain(|e| secret_ref_name(e) != Some(secret));
}

/// Add a mount of volume `name` at `path` unless the same mount exists.
pub fn append_volume_mount(mounts: &mut Vec<Value>, name: &str, path: &str) {
    let present = mounts
        .iter()
        .any(|m| m["name"] == name && m["mountPath"] == path);
    if !present {
        mounts.push(json!({"name": name, "mountPath": path}));
    }
}

pub fn remove_volume_mounts(mounts: &mut Vec<Value>, name: &str) {
    mounts.retain(|m| m["name"] != name);
}

/// Add a secret volume `name`, or point the existing one at `secret`.
pub fn update_volumes(volumes: &mut Vec<Value>, name: &str, secret: &str) {
    match volumes.iter_mut().find(|v| v["name"] == name) {
        Some(volume) => {
            if volume["secret"]["secretName"] != secret {
                volume["secret"] = json!({"secretName": secret});
            }
        }
        None => volumes.push(json!({"name": name, "secret": {"secretName": secret}})),
    }
}

pub fn remove_volumes(volumes: &mut Vec<Value>, name: &str) {
    volumes.retain(|v| v["name"] != name);
}

/// Apply `edit` to the list at `path`, writing back only on change.
///
/// A list that ends up empty is removed so that undoing an injection
/// restores the original shape.
pub fn edit_list<S, F>(object: &mut Value, path: &[S], edit: F) -> Result<()>
where
    S: AsRef<str>,
    F: FnOnce(&mut Vec<Value>),
{
    let original = tree::get_list(object, path)?;
    let mut items = original.clone();
    edit(&mut items);
    if items == original {
        return Ok(());
    }
    if items.is_empty() {
        tree::remove(object, path);
        return Ok(());
    }
    tree::set(object, path, Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_path_defaults_to_bindings_root() {
        assert_eq!(
            mount_path("", "", "foo"),
            ("/bindings/foo".to_string(), "/bindings".to_string(), false)
        );
    }

    #[test]
    fn test_mount_path_explicit_is_fixed() {
        assert_eq!(
            mount_path("", "/custom", "foo"),
            ("/custom".to_string(), "/custom".to_string(), true)
        );
    }

    #[test]
    fn test_mount_path_existing_root_wins() {
        assert_eq!(
            mount_path("/root", "", "foo"),
            ("/root/foo".to_string(), "/root".to_string(), false)
        );
        assert_eq!(
            mount_path("/root/", "/custom", "foo"),
            ("/root/foo".to_string(), "/root/".to_string(), false)
        );
    }

    #[test]
    fn test_append_env_var_overwrites_or_appends() {
        let mut env = vec![json!({"name": "SERVICE_BINDING_ROOT", "value": "/old"})];
        append_env_var(&mut env, "SERVICE_BINDING_ROOT", "/bindings");
        assert_eq!(env, vec![json!({"name": "SERVICE_BINDING_ROOT", "value": "/bindings"})]);

        append_env_var(&mut env, "OTHER", "x");
        assert_eq!(env.len(), 2);
        assert_eq!(env_var(&env, "OTHER"), Some("x"));
    }

    #[test]
    fn test_update_env_from_list_exact_match_is_noop() {
        let mut env_from = vec![json!({"secretRef": {"name": "binding"}})];
        update_env_from_list(&mut env_from, "binding", "binding");
        assert_eq!(env_from, vec![json!({"secretRef": {"name": "binding"}})]);
    }

    #[test]
    fn test_update_env_from_list_drops_stale_refs_keeps_others() {
        let mut env_from = vec![
            json!({"configMapRef": {"name": "binding-config"}}),
            json!({"secretRef": {"name": "binding-old"}}),
            json!({"secretRef": {"name": "unrelated"}}),
        ];
        update_env_from_list(&mut env_from, "binding-new", "binding");
        assert_eq!(
            env_from,
            vec![
                json!({"configMapRef": {"name": "binding-config"}}),
                json!({"secretRef": {"name": "unrelated"}}),
                json!({"secretRef": {"name": "binding-new"}}),
            ]
        );
    }

    #[test]
    fn test_remove_env_from_only_removes_secret() {
        let mut env_from = vec![
            json!({"configMapRef": {"name": "binding"}}),
            json!({"secretRef": {"name": "binding"}}),
        ];
        remove_env_from(&mut env_from, "binding");
        assert_eq!(env_from, vec![json!({"configMapRef": {"name": "binding"}})]);
    }

    #[test]
    fn test_volume_mounts() {
        let mut mounts = vec![json!({"name": "data", "mountPath": "/data"})];
        append_volume_mount(&mut mounts, "binding", "/bindings/binding");
        append_volume_mount(&mut mounts, "binding", "/bindings/binding");
        assert_eq!(mounts.len(), 2);

        remove_volume_mounts(&mut mounts, "binding");
        assert_eq!(mounts, vec![json!({"name": "data", "mountPath": "/data"})]);
    }

    #[test]
    fn test_update_volumes_repoints_existing() {
        let mut volumes = vec![json!({"name": "binding", "secret": {"secretName": "old"}})];
        update_volumes(&mut volumes, "binding", "binding");
        assert_eq!(
            volumes,
            vec![json!({"name": "binding", "secret": {"secretName": "binding"}})]
        );

        update_volumes(&mut volumes, "other", "other");
        assert_eq!(volumes.len(), 2);
        remove_volumes(&mut volumes, "other");
        assert_eq!(volumes.len(), 1);
    }

    #[test]
    fn test_edit_list_removes_emptied_list() {
        let mut object = json!({"spec": {"envFrom": [{"secretRef": {"name": "b"}}]}});
        edit_list(&mut object, &["spec", "envFrom"], |l| remove_env_from(l, "b")).unwrap();
        assert_eq!(object, json!({"spec": {}}));

        edit_list(&mut object, &["spec", "env"], |_| {}).unwrap();
        assert_eq!(object, json!({"spec": {}}));
    }
}
