// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResourceExt;
use service_binding::types::ServiceBinding;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&ServiceBinding::crd())?);
    Ok(())
}
