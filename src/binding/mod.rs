// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Binding data aggregation and key naming.

pub mod data;
pub mod envvars;
pub mod naming;
pub mod template;

pub use data::{aggregate, BindingData};
pub use naming::NamingStrategy;
