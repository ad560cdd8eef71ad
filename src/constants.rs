// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Annotation keys understood or written by the operator
pub mod annotations {
    /// Prefix of every binding annotation, `service.binding` or `service.binding/<name>`
    pub const BINDING_PREFIX: &str = "service.binding";
    /// Back-reference from a watched object to the binding(s) that use it, `namespace/name`
    pub const BINDING_REFERENCE: &str = "servicebinding.operators.coreos.com/binding";
}

/// The operator name used as field manager and in log output
pub const OPERATOR_NAME: &str = "service-binding-operator";

/// Finalizer guarding unbind on deletion
pub const FINALIZER: &str = "finalizer.servicebinding.openshift.io";

/// Environment variable pointing at the root of mounted bindings
pub const SERVICE_BINDING_ROOT: &str = "SERVICE_BINDING_ROOT";

/// Mount root used when neither a root variable nor a mount path is given
pub const DEFAULT_BINDING_ROOT: &str = "/bindings";

/// Default location of the container list in a workload manifest
pub const DEFAULT_CONTAINERS_PATH: &str = "spec.template.spec.containers";

/// Location of the pod template volumes
pub const VOLUMES_PATH: &str = "spec.template.spec.volumes";

/// Condition types and reasons surfaced on the binding status
pub mod conditions {
    pub const COLLECTION_READY: &str = "CollectionReady";
    pub const INJECTION_READY: &str = "InjectionReady";
    pub const BINDING_READY: &str = "Ready";

    pub const EMPTY_SERVICE_SELECTORS: &str = "EmptyServiceSelectors";
    pub const EMPTY_APPLICATION: &str = "EmptyApplication";
    pub const APPLICATION_NOT_FOUND: &str = "ApplicationNotFound";
    pub const SERVICE_NOT_FOUND: &str = "ServiceNotFound";
    pub const NAMING_STRATEGY_ERROR: &str = "NamingStrategyError";
    pub const BINDING_INJECTED: &str = "BindingInjected";
    pub const BINDING_FAIL: &str = "BindingFail";
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
