// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: object store, type discovery and CRD readiness.

pub mod crd;
pub mod lookup;
pub mod store;

pub use crd::wait_for_binding_crd;
pub use lookup::{KubeTypeLookup, TypeLookup};
pub use store::{KubeStore, ObjectStore};
