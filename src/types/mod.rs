// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types and resource coordinates.

pub mod binding;
pub mod gvk;

pub use binding::{
    Application, BindingPath, BoundApplication, Condition, LabelSelector, Mapping, Service,
    ServiceBinding, ServiceBindingSpec, ServiceBindingStatus,
};
pub use gvk::{Gvr, Referable};
