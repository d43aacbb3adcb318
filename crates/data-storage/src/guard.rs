// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII guard for an in-flight read.
//!
//! While a [`PendingRead`] is alive its entry cannot be freed: dropping the
//! last reference only marks the entry, and the guard's `drop` completes the
//! release. This is what lets an asynchronous read settle even when the
//! tensor it was started on is disposed first.

use crate::storage::StorageInner;
use crate::Handle;
use std::sync::Arc;

/// A registered read on one storage entry.
///
/// ```ignore
/// let read = storage.begin_read(handle)?;
/// storage.dec_ref(handle)?;      // Release::Deferred
/// use_values(read.value());      // still valid
/// drop(read);                    // entry freed here
/// ```
pub struct PendingRead<V> {
    value: Arc<V>,
    storage: Arc<StorageInner<V>>,
    handle: Handle,
}

impl<V> PendingRead<V> {
    pub(crate) fn new(value: Arc<V>, storage: Arc<StorageInner<V>>, handle: Handle) -> Self {
        Self {
            value,
            storage,
            handle,
        }
    }

    /// The value as it was when the read was registered.
    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }
}

impl<V: Clone> PendingRead<V> {
    /// Copies the value out and ends the read.
    pub fn into_value(self) -> V {
        V::clone(&self.value)
    }
}

impl<V> Drop for PendingRead<V> {
    fn drop(&mut self) {
        self.storage.end_read(self.handle);
    }
}

impl<V> std::fmt::Debug for PendingRead<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRead")
            .field("handle", &self.handle)
            .finish()
    }
}
