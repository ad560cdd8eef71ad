// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Injection of the binding secret into application workloads.

use super::container::{
    append_env_var, append_volume_mount, edit_list, env_var, mount_path, remove_env_from,
    remove_volume_mounts, remove_volumes, update_env_from_list, update_volumes,
};
use super::modifier::{modifier_for, Modifier};
use crate::constants::{SERVICE_BINDING_ROOT, VOLUMES_PATH};
use crate::error::{Error, ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::{object_kind, object_name, ObjectStore};
use crate::tree::{self, split_path};
use crate::types::{Application, ServiceBinding};
use kube::discovery::ApiResource;
use kube::ResourceExt;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Binds and unbinds the application workloads selected by one binding.
pub struct Binder<'a> {
    store: &'a dyn ObjectStore,
    lookup: &'a dyn TypeLookup,
    name: String,
    namespace: String,
    secret: String,
    bind_as_files: bool,
    mount_path: String,
    application: Option<Application>,
}

impl<'a> Binder<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        lookup: &'a dyn TypeLookup,
        binding: &ServiceBinding,
    ) -> Self {
        Self {
            store,
            lookup,
            name: binding.name_any(),
            namespace: binding.namespace().unwrap_or_default(),
            secret: binding.secret_name(),
            bind_as_files: binding.spec.bind_as_files,
            mount_path: binding.spec.mount_path.clone().unwrap_or_default(),
            application: binding.spec.application.clone(),
        }
    }

    /// Find the workloads selected by the application, by name first and
    /// by labels otherwise.
    #[instrument(skip(self), fields(binding = %self.name, namespace = %self.namespace))]
    pub async fn search(&self) -> Result<(ApiResource, Vec<Value>)> {
        let Some(application) = &self.application else {
            return Err(Error::EmptyApplication);
        };

        if let Some(name) = application.name.as_deref().filter(|n| !n.is_empty()) {
            let resource = self.lookup.resource_for_referable(application).await?;
            return match self.store.get(&resource, &self.namespace, name).await {
                Ok(object) => Ok((resource, vec![object])),
                Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ApplicationNotFound),
                Err(e) => Err(e),
            };
        }

        let Some(selector) = application
            .label_selector
            .as_ref()
            .and_then(|s| s.to_selector_string())
        else {
            return Err(Error::EmptyApplication);
        };

        let resource = self.lookup.resource_for_referable(application).await?;
        let objects = self
            .store
            .list(&resource, &self.namespace, Some(&selector))
            .await?;
        if objects.is_empty() {
            return Err(Error::ApplicationNotFound);
        }
        Ok((resource, objects))
    }

    /// Inject the secret into every selected workload.
    ///
    /// Returns all selected workloads in their current state; those that
    /// already carried the binding are not written.
    pub async fn bind(&self) -> Result<Vec<Value>> {
        let (resource, objects) = self.search().await?;
        let modifier = modifier_for(&resource);

        let mut bound = Vec::with_capacity(objects.len());
        for object in objects {
            let mut updated = object.clone();
            self.apply_binding(&mut updated)?;

            if updated == object {
                debug!(
                    "{} {} already bound, skipping",
                    object_kind(&object),
                    object_name(&object)
                );
                bound.push(object);
                continue;
            }

            bound.push(self.write(&resource, updated, modifier).await?);
        }
        Ok(bound)
    }

    async fn write(
        &self,
        resource: &ApiResource,
        mut object: Value,
        modifier: Option<Modifier>,
    ) -> Result<Value> {
        if let Some(modify) = modifier {
            modify(&mut object)?;
        }
        info!(
            "Updating {} {}/{}",
            object_kind(&object),
            self.namespace,
            object_name(&object)
        );
        self.store.update(resource, &self.namespace, &object).await
    }

    /// Remove the binding from every selected workload.
    ///
    /// A workload that no longer exists has nothing left to unbind.
    pub async fn unbind(&self) -> Result<()> {
        let (resource, objects) = match self.search().await {
            Ok(found) => found,
            Err(e) if matches!(e.kind(), ErrorKind::ApplicationNotFound | ErrorKind::EmptyApplication) => {
                info!("No application left to unbind: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        for mut object in objects {
            self.remove_binding(&mut object)?;
            info!(
                "Unbinding {} {}/{}",
                object_kind(&object),
                self.namespace,
                object_name(&object)
            );
            self.store.update(&resource, &self.namespace, &object).await?;
        }
        Ok(())
    }

    /// Mutate `object` so that it references the binding secret.
    pub fn apply_binding(&self, object: &mut Value) -> Result<()> {
        let Some(application) = &self.application else {
            return Ok(());
        };

        if let Some(path) = application.secret_path() {
            tree::set(object, &split_path(&path), json!(self.secret))?;
        }

        if let Some(path) = application.containers_path() {
            let path = split_path(&path);
            let mut containers = containers_at(object, &path)?;
            for container in containers.iter_mut() {
                self.bind_container(container)?;
            }
            tree::set(object, &path, Value::Array(containers))?;
        }

        if self.bind_as_files {
            edit_list(object, &split_path(VOLUMES_PATH), |volumes| {
                update_volumes(volumes, &self.name, &self.secret)
            })?;
        }
        Ok(())
    }

    fn bind_container(&self, container: &mut Value) -> Result<()> {
        if !self.bind_as_files {
            return edit_list(container, &["envFrom"], |env_from| {
                update_env_from_list(env_from, &self.secret, &self.name)
            });
        }

        let env = tree::get_list(container, &["env"])?;
        let root = env_var(&env, SERVICE_BINDING_ROOT).unwrap_or_default();
        let (path, root, fixed) = mount_path(root, &self.mount_path, &self.name);

        edit_list(container, &["volumeMounts"], |mounts| {
            append_volume_mount(mounts, &self.name, &path)
        })?;
        if !fixed {
            edit_list(container, &["env"], |env| {
                append_env_var(env, SERVICE_BINDING_ROOT, &root)
            })?;
        }
        Ok(())
    }

    /// Strip the binding's volume, mounts and secret references from `object`.
    pub fn remove_binding(&self, object: &mut Value) -> Result<()> {
        let Some(application) = &self.application else {
            return Ok(());
        };

        if let Some(path) = application.containers_path() {
            let path = split_path(&path);
            let mut containers = containers_at(object, &path)?;
            for container in containers.iter_mut() {
                if self.bind_as_files {
                    edit_list(container, &["volumeMounts"], |mounts| {
                        remove_volume_mounts(mounts, &self.name)
                    })?;
                } else {
                    edit_list(container, &["envFrom"], |env_from| {
                        remove_env_from(env_from, &self.secret)
                    })?;
                }
            }
            tree::set(object, &path, Value::Array(containers))?;
        }

        if self.bind_as_files {
            edit_list(object, &split_path(VOLUMES_PATH), |volumes| {
                remove_volumes(volumes, &self.name)
            })?;
        }
        Ok(())
    }
}

fn containers_at(object: &Value, path: &[String]) -> Result<Vec<Value>> {
    match tree::get_required(object, path)? {
        Value::Array(containers) => Ok(containers.clone()),
        _ => Err(Error::shape(path.join("."), "expected a list of containers")),
    }
}
