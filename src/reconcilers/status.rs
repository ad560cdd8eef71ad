// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Status conditions and persistence of the binding object itself.

use crate::error::Result;
use crate::kubernetes::store::ObjectStore;
use crate::types::{Condition, ServiceBinding, ServiceBindingStatus};
use chrono::{SecondsFormat, Utc};
use kube::discovery::ApiResource;
use kube::ResourceExt;
use tracing::debug;

fn resource() -> ApiResource {
    ApiResource::erase::<ServiceBinding>(&())
}

/// Insert or update the condition of the same type.
///
/// `lastTransitionTime` only moves when the status flips.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        Some(existing) => {
            if existing.status != condition.status || existing.last_transition_time.is_none() {
                existing.status = condition.status;
                existing.last_transition_time = Some(now());
            }
            existing.reason = condition.reason;
            existing.message = condition.message;
        }
        None => {
            condition.last_transition_time = Some(now());
            conditions.push(condition);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Write `status` when it differs from the recorded one.
///
/// Returns whether a write happened; `binding` is refreshed from the server
/// response.
pub async fn update_status(
    store: &dyn ObjectStore,
    binding: &mut ServiceBinding,
    status: ServiceBindingStatus,
) -> Result<bool> {
    if binding.status.as_ref() == Some(&status) {
        debug!("Status of {} unchanged", binding.name_any());
        return Ok(false);
    }

    binding.status = Some(status);
    let namespace = binding.namespace().unwrap_or_default();
    let object = serde_json::to_value(&*binding)?;
    let updated = store.update_status(&resource(), &namespace, &object).await?;
    *binding = serde_json::from_value(updated)?;
    Ok(true)
}

/// Persist metadata changes such as finalizers.
pub async fn update_binding(store: &dyn ObjectStore, binding: &mut ServiceBinding) -> Result<()> {
    let namespace = binding.namespace().unwrap_or_default();
    let object = serde_json::to_value(&*binding)?;
    let updated = store.update(&resource(), &namespace, &object).await?;
    *binding = serde_json::from_value(updated)?;
    Ok(())
}
