// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Backing service resolution.

pub mod context;
pub mod owned;

pub use context::{ServiceContext, ServiceContextResolver};
