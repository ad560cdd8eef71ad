// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciler driving a ServiceBinding from request to injected workload.

use super::result::ReconcileResult;
use super::service_binder::{ServiceBinder, ServiceBinderOptions};
use super::status::{set_condition, update_binding, update_status};
use crate::binding::{aggregate, BindingData, NamingStrategy};
use crate::constants::conditions::{
    BINDING_READY, COLLECTION_READY, EMPTY_SERVICE_SELECTORS, INJECTION_READY,
    NAMING_STRATEGY_ERROR, SERVICE_NOT_FOUND,
};
use crate::error::{Error, ErrorKind, Result};
use crate::kubernetes::lookup::TypeLookup;
use crate::kubernetes::store::ObjectStore;
use crate::service::{ServiceContext, ServiceContextResolver};
use crate::sync::{ObjectKey, Reconcile, ResourceWatcher};
use crate::types::gvk::Referable;
use crate::types::{Condition, ServiceBinding};
use async_trait::async_trait;
use kube::discovery::ApiResource;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct BindingReconciler {
    store: Arc<dyn ObjectStore>,
    lookup: Arc<dyn TypeLookup>,
    watches: Arc<dyn ResourceWatcher>,
}

#[async_trait]
impl Reconcile for BindingReconciler {
    async fn reconcile(&self, key: &ObjectKey) -> ReconcileResult {
        self.reconcile_binding(key).await
    }
}

impl BindingReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        lookup: Arc<dyn TypeLookup>,
        watches: Arc<dyn ResourceWatcher>,
    ) -> Self {
        Self {
            store,
            lookup,
            watches,
        }
    }

    #[instrument(skip(self), fields(namespace = %key.namespace, name = %key.name))]
    async fn reconcile_binding(&self, key: &ObjectKey) -> ReconcileResult {
        let store = self.store.as_ref();

        let mut binding = match self.fetch(key).await {
            Ok(Some(binding)) => binding,
            Ok(None) => {
                debug!("ServiceBinding no longer exists");
                return ReconcileResult::done();
            }
            Err(e) => return ReconcileResult::requeue_error(e),
        };

        if !binding.is_deleting() && binding.add_finalizer() {
            info!("Adding finalizer");
            if let Err(e) = update_binding(store, &mut binding).await {
                return ReconcileResult::requeue_error(e);
            }
        }

        if !binding.is_deleting() && binding.spec.services.is_empty() {
            return self.on_empty_services(binding).await;
        }

        let contexts = if binding.is_deleting() {
            Vec::new()
        } else {
            match self.resolve(&binding).await {
                Ok(contexts) => contexts,
                Err(e) if e.kind() == ErrorKind::ServiceNotFound => {
                    warn!("Backing service missing: {}", e);
                    return self.fail_all(binding, SERVICE_NOT_FOUND, e).await;
                }
                Err(e) => {
                    error!("Failed to resolve services: {}", e);
                    return ReconcileResult::requeue_error(e);
                }
            }
        };

        let data = match self.build_data(&binding, &contexts) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NamingStrategy => {
                error!("Naming strategy failed: {}", e);
                return self.on_naming_error(binding, e).await;
            }
            Err(e) => {
                error!("Failed to build binding data: {}", e);
                return ReconcileResult::requeue_error(e);
            }
        };

        let mut binder = match ServiceBinder::new(ServiceBinderOptions {
            store,
            lookup: self.lookup.as_ref(),
            binding: binding.clone(),
            data,
        }) {
            Ok(binder) => binder,
            Err(e) => {
                error!("Invalid binder options: {}", e);
                return ReconcileResult::no_requeue(e);
            }
        };

        self.register_watches(&binding).await;

        if binding.is_deleting() {
            if binding.has_owner_references() {
                info!("Owned binding is being deleted, releasing finalizer");
                return self.release(binding).await;
            }
            return binder.unbind().await;
        }

        binder.bind().await
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<ServiceBinding>> {
        let resource = ApiResource::erase::<ServiceBinding>(&());
        match self.store.get(&resource, &key.namespace, &key.name).await {
            Ok(object) => Ok(Some(serde_json::from_value(object)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn resolve(&self, binding: &ServiceBinding) -> Result<Vec<ServiceContext>> {
        let namespace = binding.namespace().unwrap_or_default();
        ServiceContextResolver::new(
            self.store.as_ref(),
            self.lookup.as_ref(),
            &namespace,
            binding.spec.detect_binding_resources,
        )
        .resolve(&binding.spec.services)
        .await
    }

    fn build_data(&self, binding: &ServiceBinding, contexts: &[ServiceContext]) -> Result<BindingData> {
        let naming = NamingStrategy::new(binding.spec.naming_strategy.as_deref());
        aggregate(
            binding.spec.name_prefix.as_deref(),
            contexts,
            &binding.spec.mappings,
            &naming,
        )
    }

    /// Requeues once: the pass that records the conditions asks for another,
    /// the pass that finds them already recorded does not.
    async fn on_empty_services(&self, mut binding: ServiceBinding) -> ReconcileResult {
        let mut status = binding.status.clone().unwrap_or_default();
        for condition_type in [COLLECTION_READY, INJECTION_READY, BINDING_READY] {
            set_condition(
                &mut status.conditions,
                Condition::new(condition_type, false).reason(EMPTY_SERVICE_SELECTORS),
            );
        }
        match update_status(self.store.as_ref(), &mut binding, status).await {
            Ok(true) => {
                info!("No services selected");
                ReconcileResult::requeue()
            }
            Ok(false) => ReconcileResult::done(),
            Err(e) => ReconcileResult::requeue_error(e),
        }
    }

    async fn fail_all(&self, mut binding: ServiceBinding, reason: &str, error: Error) -> ReconcileResult {
        let mut status = binding.status.clone().unwrap_or_default();
        for condition_type in [COLLECTION_READY, INJECTION_READY, BINDING_READY] {
            set_condition(
                &mut status.conditions,
                Condition::new(condition_type, false)
                    .reason(reason)
                    .message(error.to_string()),
            );
        }
        if let Err(e) = update_status(self.store.as_ref(), &mut binding, status).await {
            error!("Failed to record {}: {}", reason, e);
        }
        ReconcileResult::requeue_error(error)
    }

    async fn on_naming_error(&self, mut binding: ServiceBinding, error: Error) -> ReconcileResult {
        let mut status = binding.status.clone().unwrap_or_default();
        set_condition(
            &mut status.conditions,
            Condition::new(COLLECTION_READY, false)
                .reason(NAMING_STRATEGY_ERROR)
                .message(error.to_string()),
        );
        if let Err(e) = update_status(self.store.as_ref(), &mut binding, status).await {
            return ReconcileResult::requeue_error(e);
        }
        ReconcileResult::no_requeue(error)
    }

    async fn release(&self, mut binding: ServiceBinding) -> ReconcileResult {
        if !binding.remove_finalizer() {
            return ReconcileResult::done();
        }
        match update_binding(self.store.as_ref(), &mut binding).await {
            Ok(()) => ReconcileResult::done(),
            Err(e) => ReconcileResult::requeue_error(e),
        }
    }

    async fn register_watches(&self, binding: &ServiceBinding) {
        let mut referables: Vec<&(dyn Referable + Sync)> = Vec::new();
        if let Some(application) = &binding.spec.application {
            referables.push(application);
        }
        for service in &binding.spec.services {
            referables.push(service);
        }

        for referable in referables {
            match self.lookup.resource_for_referable(referable).await {
                Ok(resource) => self.watches.add_watch(&resource),
                Err(e) => warn!("Unable to watch {:?}: {}", referable.gvk(), e),
            }
        }
    }
}
