// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! The strided tensor memory model: how tensor contents are described,
//! staged, handed to a backend and read back.
//!
//! This crate provides:
//! - [`Shape`] and the stride/index arithmetic in [`shape`].
//! - [`DType`] and the value containers [`DataValues`] / [`TensorData`].
//! - [`TensorBuffer`]: a mutable, coordinate-indexed staging buffer.
//! - [`Tensor`]: an immutable, disposable handle on backend data.
//! - [`Variable`]: a tensor whose data can be reassigned in place.
//! - [`TensorTracker`] / [`OpHandler`]: the traits a backend implements,
//!   bundled into the [`Context`] each handle carries.
//! - Factories on [`Context`]: `tensor`, `scalar`, `tensor1d`..`tensor6d`,
//!   `buffer`, `complex`.
//!
//! The crate owns no memory beyond buffers; see the `engine` crate for a
//! tracker implementation.

mod buffer;
pub mod cast;
mod dtype;
mod error;
mod factory;
pub mod format;
pub mod nested;
pub mod shape;
mod tensor;
mod tracker;
mod values;

pub use buffer::TensorBuffer;
pub use dtype::DType;
pub use error::TensorError;
pub use nested::{NestedArray, TypedArray};
pub use shape::Shape;
pub use tensor::{RankType, Tensor, TensorId, Variable};
pub use tracker::{
    Context, DataId, Flags, GpuData, GpuReadOptions, GpuResource, OpHandler, ReadFuture,
    TensorTracker,
};
pub use values::{DataValues, Scalar, TensorBytes, TensorData};
