// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # engine
//!
//! A CPU-resident [`TensorTracker`](tensor_core::TensorTracker) and
//! [`OpHandler`](tensor_core::OpHandler) for `tensor-core`.
//!
//! The engine keeps tensor values in a reference-counted
//! [`DataStorage`](data_storage::DataStorage) arena, counts live handles,
//! runs disposal scopes ([`Engine::tidy`]) and owns the variable registry.
//!
//! ## Quick Start
//! ```
//! use engine::{Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let kept = engine.tidy(|ctx| {
//!     let scratch = ctx.tensor1d(vec![1.0, 2.0], None).unwrap();
//!     scratch.reshape(vec![2, 1]).unwrap()
//! });
//! assert_eq!(kept.shape().dims(), &[2, 1]);
//! assert_eq!(engine.memory().num_tensors, 1);
//! ```

pub mod config;
mod engine;
pub mod error;
pub mod memory;
pub mod scope;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use memory::MemoryInfo;
pub use scope::TensorContainer;
