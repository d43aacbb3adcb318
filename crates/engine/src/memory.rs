// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory accounting snapshot.

use data_storage::StorageStats;

/// What an [`Engine`](crate::Engine) is holding at one point in time.
///
/// `num_tensors` counts live handles, so two tensors sharing data after a
/// `reshape` count twice while `num_data_buffers` counts once.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemoryInfo {
    /// Live tensor handles, variables included.
    pub num_tensors: usize,
    /// Live storage entries, including those awaiting a deferred release.
    pub num_data_buffers: usize,
    /// Bytes held by those entries. Strings count their encoded length.
    pub num_bytes: usize,
    /// Live handles of dtype `string`.
    pub num_string_tensors: usize,
    /// Cumulative storage counters.
    pub storage: StorageStats,
}

impl MemoryInfo {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} tensors ({} string), {} data buffers, {} bytes",
            self.num_tensors, self.num_string_tensors, self.num_data_buffers, self.num_bytes,
        )
    }
}
