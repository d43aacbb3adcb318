// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use crate::TensorError;
use std::fmt;
use std::str::FromStr;

/// Enumerates the element types a [`crate::Tensor`] can hold.
///
/// The set is closed; every consumer matches on it exhaustively.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point. The default when no dtype is given.
    #[default]
    Float32,
    /// 32-bit signed integer.
    Int32,
    /// Boolean, stored as one byte per element (0 or 1).
    Bool,
    /// Variable-length UTF-8 strings, stored as raw bytes per element.
    String,
    /// Complex number stored as an interleaved `(re, im)` pair of `f32`.
    Complex64,
}

impl DType {
    /// Returns the storage size of a single element in bytes, or `None` for
    /// strings whose size depends on their contents.
    pub fn bytes_per_element(self) -> Option<usize> {
        match self {
            DType::Float32 | DType::Int32 => Some(4),
            DType::Bool => Some(1),
            DType::Complex64 => Some(8),
            DType::String => None,
        }
    }

    /// Returns the canonical lowercase label (`"float32"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Int32 => "int32",
            DType::Bool => "bool",
            DType::String => "string",
            DType::Complex64 => "complex64",
        }
    }

    /// Returns the common dtype two operands promote to.
    ///
    /// The lattice is `bool < int32 < float32 < complex64`; strings only
    /// combine with strings.
    pub fn upcast(self, other: DType) -> Result<DType, TensorError> {
        let rank = |d: DType| match d {
            DType::Bool => Some(0),
            DType::Int32 => Some(1),
            DType::Float32 => Some(2),
            DType::Complex64 => Some(3),
            DType::String => None,
        };
        match (rank(self), rank(other)) {
            (Some(a), Some(b)) => Ok(if a >= b { self } else { other }),
            (None, None) => Ok(DType::String),
            _ => Err(TensorError::Cast {
                from: self,
                to: other,
                detail: "only strings can be upcast to strings".into(),
            }),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "float32" => Ok(DType::Float32),
            "int32" => Ok(DType::Int32),
            "bool" => Ok(DType::Bool),
            "string" => Ok(DType::String),
            "complex64" => Ok(DType::Complex64),
            other => Err(TensorError::UnknownDType(other.to_string())),
        }
    }
}
