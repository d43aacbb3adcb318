// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the engine.

/// Errors that can occur while configuring or driving an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A tensor operation failed.
    #[error("tensor error: {0}")]
    Tensor(#[from] tensor_core::TensorError),

    /// The storage arena rejected a request.
    #[error("storage error: {0}")]
    Storage(#[from] data_storage::StorageError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
