// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction, access and lifecycle.
//!
//! Every variant carries the offending values (coordinates, shapes, counts,
//! dtypes) so a message alone is enough to locate a shape bug.

use crate::{DType, Shape};

/// Errors that can occur in the tensor/buffer layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TensorError {
    // ── Construction validation ────────────────────────────────
    /// `null` was passed where tensor values were expected.
    #[error("values passed to tensor(values) must be a non-null value")]
    NullInput,

    /// A flat value array does not hold `size` elements.
    #[error("length of values '{actual}' does not match the size inferred by the shape '{expected}'")]
    ValueCountMismatch { expected: usize, actual: usize },

    /// The provided shape and the inferred value count disagree.
    #[error("based on the provided shape, {shape}, the tensor should have {expected} values but has {actual}")]
    ShapeSizeMismatch {
        shape: Shape,
        expected: usize,
        actual: usize,
    },

    /// The provided shape and the nested structure disagree dimension-wise.
    #[error("error creating a new Tensor. Inferred shape {inferred} does not match the provided shape {provided}")]
    InferredShapeMismatch { inferred: Shape, provided: Shape },

    /// A nested array is ragged or mixes primitives and arrays.
    #[error("{0}")]
    RaggedArray(String),

    /// A factory was called with arguments it cannot accept.
    #[error("{0}")]
    InvalidArgument(String),

    /// `complex64` buffers cannot be built directly.
    #[error("complex64 dtype TensorBuffers are not supported. Please create a TensorBuffer for the real and imaginary parts separately and call complex(real, imag).")]
    ComplexBuffer,

    /// `complex64` tensors cannot be built from plain values.
    #[error("cannot construct a complex64 tensor directly. Please use complex(real, imag).")]
    ComplexConstruction,

    /// A value does not fit the dtype it is being stored as.
    #[error("a tensor of type {dtype} being uploaded contains {value}")]
    InvalidUpload { dtype: DType, value: f64 },

    /// A scalar of the wrong kind was written into a buffer.
    #[error("cannot store {value} in a {dtype} buffer")]
    ValueType { dtype: DType, value: String },

    /// The requested data type string is not one of the five dtypes.
    #[error("unknown dtype '{0}'; expected float32, int32, bool, string or complex64")]
    UnknownDType(String),

    // ── Access validation ──────────────────────────────────────
    /// The number of coordinates does not match the rank.
    #[error("the number of provided coordinates ({actual}) must match the rank ({rank})")]
    RankMismatch { rank: usize, actual: usize },

    /// A coordinate is outside the buffer's shape.
    #[error("requested out of range element at {locs:?}; buffer shape={shape}")]
    OutOfRange { locs: Vec<usize>, shape: Shape },

    /// A reshape target has a different element count.
    #[error("size({size}) must match the product of shape {shape}")]
    ReshapeSize { size: usize, shape: Shape },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    // ── Lifecycle ──────────────────────────────────────────────
    /// The tensor handle was disposed.
    #[error("Tensor is disposed.")]
    Disposed,

    // ── Decode ─────────────────────────────────────────────────
    /// String bytes are not valid UTF-8.
    #[error("failed to decode the string bytes into utf-8. To get the original bytes, call tensor.bytes().")]
    Decode,

    // ── Variables ──────────────────────────────────────────────
    /// `assign` was given a value of another dtype.
    #[error("dtype of the new value ({new}) and previous value ({current}) must match")]
    VariableDType { current: DType, new: DType },

    /// `assign` was given a value of another shape.
    #[error("shape of the new value ({new}) and previous value ({current}) must match")]
    VariableShape { current: Shape, new: Shape },

    /// A variable name is already in use.
    #[error("variable with name {0} was already registered")]
    VariableExists(String),

    /// The tracker has no variable by that name.
    #[error("variable with name {0} was not registered")]
    VariableUnknown(String),

    // ── Dtype conversion ───────────────────────────────────────
    /// A cast between two dtypes is not defined.
    #[error("cannot cast {from} to {to}: {detail}")]
    Cast {
        from: DType,
        to: DType,
        detail: String,
    },

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    // ── Backend ────────────────────────────────────────────────
    /// The tracker/backend does not implement an operation.
    #[error("{op} is not supported by this backend: {detail}")]
    Unsupported { op: &'static str, detail: String },

    /// The tracker/backend failed while servicing a request.
    #[error("backend error in {op}: {detail}")]
    Backend { op: &'static str, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_values() {
        let e = TensorError::OutOfRange {
            locs: vec![1, 5],
            shape: Shape::matrix(2, 3),
        };
        assert_eq!(
            e.to_string(),
            "requested out of range element at [1, 5]; buffer shape=[2, 3]"
        );

        let e = TensorError::ValueCountMismatch {
            expected: 6,
            actual: 5,
        };
        assert!(e.to_string().contains("'5'"));
        assert!(e.to_string().contains("'6'"));

        let e = TensorError::VariableShape {
            current: Shape::matrix(2, 2),
            new: Shape::vector(4),
        };
        assert_eq!(
            e.to_string(),
            "shape of the new value ([4]) and previous value ([2, 2]) must match"
        );
    }

    #[test]
    fn test_disposed_message() {
        assert_eq!(TensorError::Disposed.to_string(), "Tensor is disposed.");
    }
}
