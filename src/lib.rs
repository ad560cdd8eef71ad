// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod annotations;
pub mod binding;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod reconcilers;
pub mod service;
pub mod sync;
pub mod tree;
pub mod types;
pub mod workload;

#[cfg(test)]
pub mod test_utils;
