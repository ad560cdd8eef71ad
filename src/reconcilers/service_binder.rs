// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bind and unbind steps of a single binding.

use super::result::ReconcileResult;
use super::secret;
use super::status::{set_condition, update_binding, update_status};
use crate::binding::BindingData;
use crate::constants::conditions::{
    APPLICATION_NOT_FOUND, BINDING_FAIL, BINDING_INJECTED, BINDING_READY, COLLECTION_READY,
    EMPTY_APPLICATION, INJECTION_READY,
};
use crate::error::{Error, ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::{object_api_version, object_kind, object_name, ObjectStore};
use crate::types::gvk::parse_api_version;
use crate::types::{BoundApplication, Condition, ServiceBinding, ServiceBindingStatus};
use crate::workload::Binder;
use kube::ResourceExt;
use serde_json::Value;
use tracing::{error, info, instrument};

pub struct ServiceBinderOptions<'a> {
    pub store: &'a dyn ObjectStore,
    pub lookup: &'a dyn TypeLookup,
    pub binding: ServiceBinding,
    pub data: BindingData,
}

impl ServiceBinderOptions<'_> {
    pub fn validate(&self) -> Result<()> {
        if self.binding.metadata.name.as_deref().is_none_or(str::is_empty) {
            return Err(Error::InvalidOptions("name"));
        }
        if self.binding.metadata.namespace.as_deref().is_none_or(str::is_empty) {
            return Err(Error::InvalidOptions("namespace"));
        }
        Ok(())
    }
}

/// Writes the secret, injects it into the application and records the
/// outcome on the binding status.
pub struct ServiceBinder<'a> {
    store: &'a dyn ObjectStore,
    binder: Binder<'a>,
    binding: ServiceBinding,
    data: BindingData,
}

impl<'a> ServiceBinder<'a> {
    pub fn new(options: ServiceBinderOptions<'a>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            store: options.store,
            binder: Binder::new(options.store, options.lookup, &options.binding),
            binding: options.binding,
            data: options.data,
        })
    }

    #[instrument(skip(self), fields(binding = %self.binding.name_any()))]
    pub async fn bind(&mut self) -> ReconcileResult {
        let mut status = self.binding.status.clone().unwrap_or_default();

        let secret = match secret::create_or_update(self.store, &self.binding, &self.data).await {
            Ok(secret) => secret,
            Err(e) => {
                error!("Failed to write binding secret: {}", e);
                return self.on_error(status, e).await;
            }
        };
        status.secret = object_name(&secret).to_string();
        set_condition(&mut status.conditions, Condition::new(COLLECTION_READY, true));

        match self.binder.bind().await {
            Ok(applications) => {
                status.applications = applications.iter().map(bound_application).collect();
                for condition_type in [INJECTION_READY, BINDING_READY] {
                    set_condition(
                        &mut status.conditions,
                        Condition::new(condition_type, true).reason(BINDING_INJECTED),
                    );
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::ApplicationNotFound | ErrorKind::EmptyApplication) => {
                let reason = match e.kind() {
                    ErrorKind::ApplicationNotFound => APPLICATION_NOT_FOUND,
                    _ => EMPTY_APPLICATION,
                };
                info!("Application not bound: {}", e);
                for condition_type in [INJECTION_READY, BINDING_READY] {
                    set_condition(
                        &mut status.conditions,
                        Condition::new(condition_type, false)
                            .reason(reason)
                            .message(e.to_string()),
                    );
                }
                return match update_status(self.store, &mut self.binding, status).await {
                    Ok(_) => ReconcileResult::done(),
                    Err(e) => ReconcileResult::requeue_error(e),
                };
            }
            Err(e) => {
                error!("Failed to bind application: {}", e);
                return self.on_error(status, e).await;
            }
        }

        if let Err(e) = update_status(self.store, &mut self.binding, status).await {
            return ReconcileResult::requeue_error(e);
        }
        info!("Binding injected");
        ReconcileResult::done()
    }

    async fn on_error(&mut self, mut status: ServiceBindingStatus, error: Error) -> ReconcileResult {
        set_condition(
            &mut status.conditions,
            Condition::new(INJECTION_READY, false)
                .reason(BINDING_FAIL)
                .message(error.to_string()),
        );
        if let Err(e) = update_status(self.store, &mut self.binding, status).await {
            error!("Failed to record binding failure: {}", e);
        }
        ReconcileResult::requeue_error(error)
    }

    /// Undo the injection and release the binding for deletion.
    #[instrument(skip(self), fields(binding = %self.binding.name_any()))]
    pub async fn unbind(&mut self) -> ReconcileResult {
        if !self.binding.has_finalizer() {
            info!("Binding can be safely deleted");
            return ReconcileResult::done();
        }

        if let Err(e) = self.binder.unbind().await {
            error!("Failed to unbind application: {}", e);
            return ReconcileResult::requeue_error(e);
        }

        self.binding.remove_finalizer();
        if let Err(e) = update_binding(self.store, &mut self.binding).await {
            return ReconcileResult::requeue_error(e);
        }
        info!("Unbound application, finalizer removed");
        ReconcileResult::done()
    }
}

fn bound_application(object: &Value) -> BoundApplication {
    let (group, version) = parse_api_version(object_api_version(object));
    BoundApplication {
        group,
        version,
        kind: object_kind(object).to_string(),
        name: object_name(object).to_string(),
    }
}
