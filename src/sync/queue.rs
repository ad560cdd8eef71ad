// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deduplicating work queue of binding keys.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Namespace and name of a binding
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Parse a `namespace/name` reference
    pub fn parse(reference: &str) -> Option<Self> {
        let (namespace, name) = reference.trim().split_once('/')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(namespace, name))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ObjectKey>,
    queued: HashSet<ObjectKey>,
    processing: HashSet<ObjectKey>,
    dirty: HashSet<ObjectKey>,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
}

/// Work queue handing out each key to at most one worker at a time.
///
/// Adding a key that is already pending is a no-op. Adding a key that is
/// being processed marks it dirty; it is re-delivered once [`WorkQueue::done`]
/// is called for it.
#[derive(Clone, Default)]
pub struct WorkQueue {
    shared: Arc<Shared>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, key: ObjectKey) {
        let mut state = self.state();
        if state.shutdown || state.queued.contains(&key) {
            return;
        }
        if state.processing.contains(&key) {
            debug!("{} is being processed, marking dirty", key);
            state.dirty.insert(key);
            return;
        }
        state.queued.insert(key.clone());
        state.pending.push_back(key);
        drop(state);
        self.shared.notify.notify_one();
    }

    /// Add `key` once `delay` has passed.
    pub fn add_after(&self, key: ObjectKey, delay: Duration) {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Wait for the next key; `None` once the queue is shut down.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            // Registered before the state check so a shutdown in between is not lost.
            let mut notified = pin!(self.shared.notify.notified());
            notified.as_mut().enable();
            {
                let mut state = self.state();
                if state.shutdown {
                    return None;
                }
                if let Some(key) = state.pending.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    let more = !state.pending.is_empty();
                    drop(state);
                    if more {
                        self.shared.notify.notify_one();
                    }
                    return Some(key);
                }
            }
            notified.await;
        }
    }

    /// Mark `key` as processed, re-queueing it if it was added meanwhile.
    pub fn done(&self, key: &ObjectKey) {
        let mut state = self.state();
        state.processing.remove(key);
        if state.dirty.remove(key) && !state.shutdown {
            state.queued.insert(key.clone());
            state.pending.push_back(key.clone());
            drop(state);
            self.shared.notify.notify_one();
        }
    }

    pub fn shutdown(&self) {
        self.state().shutdown = true;
        self.shared.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
