// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the storage arena.

use crate::Handle;

/// Errors that can occur while storing, referencing or reading data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The write would exceed the memory budget.
    #[error("out of memory: requested {requested_bytes} bytes, but only {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// The handle was released, or never issued by this storage.
    #[error("stale or unknown data handle {0}")]
    StaleHandle(Handle),

    /// A budget string could not be parsed.
    #[error("invalid memory budget '{input}': {reason}")]
    InvalidBudget { input: String, reason: String },

    /// A budget of zero bytes was requested.
    #[error("memory budget must be greater than zero")]
    ZeroBudget,

    /// Internal bookkeeping is unusable (a lock was poisoned).
    #[error("storage integrity error: {0}")]
    Corrupted(String),
}
