// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;

/// Outcome of a single reconcile pass.
///
/// `requeue` asks the work queue to deliver the key again after the
/// configured delay. `error` is reported by the worker either way.
#[derive(Debug, Default)]
pub struct ReconcileResult {
    pub requeue: bool,
    pub error: Option<Error>,
}

impl ReconcileResult {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue() -> Self {
        Self {
            requeue: true,
            error: None,
        }
    }

    pub fn requeue_error(error: Error) -> Self {
        Self {
            requeue: true,
            error: Some(error),
        }
    }

    /// Terminal failure, retrying would not help
    pub fn no_requeue(error: Error) -> Self {
        Self {
            requeue: false,
            error: Some(error),
        }
    }
}
