// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Application workload mutation.

pub mod binder;
pub mod container;
pub mod modifier;

pub use binder::Binder;
