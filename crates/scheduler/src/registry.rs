// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HandlerRegistry: name -> executor binding. Reads are lock-free in spirit (a single short
//! lock, never held across an await); writes are exclusive.

use parking_lot::RwLock;
use pulse_core::{Executor, PulseError, PulseResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide name -> executor binding, populated at startup and on
/// plugin connect/disconnect.
#[derive(Default)]
pub struct HandlerRegistry {
    bindings: RwLock<HashMap<String, Arc<dyn Executor>>>,
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Idempotent by (name, executor-identity): registering the exact
    /// same executor instance under the same name twice is a no-op;
    /// registering a different executor under an already-bound name is
    /// a `Conflict` (`Register`).
    pub fn register(&self, name: impl Into<String>, executor: Arc<dyn Executor>) -> PulseResult<()> {
        let name = name.into();
        let mut bindings = self.bindings.write();
        match bindings.get(&name) {
            Some(existing) if Arc::ptr_eq(existing, &executor) => Ok(()),
            Some(_) => Err(PulseError::conflict(format!(
                "handler `{name}` is already registered to a different executor"
            ))),
            None => {
                bindings.insert(name, executor);
                Ok(())
            }
        }
    }

    /// Removes the binding. In-flight jobs already holding a resolved
    /// executor handle complete normally (`Unregister`).
    pub fn unregister(&self, name: &str) {
        self.bindings.write().remove(name);
    }

    pub fn resolve(&self, name: &str) -> PulseResult<Arc<dyn Executor>> {
        self.bindings
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PulseError::new(pulse_core::ErrorKind::HandlerNotRegistered, format!("no handler registered for `{name}`")))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
