// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of ServiceBinding requests.

pub mod binding;
pub mod result;
pub mod secret;
pub mod service_binder;
pub mod status;

pub use binding::BindingReconciler;
pub use result::ReconcileResult;
pub use service_binder::{ServiceBinder, ServiceBinderOptions};
