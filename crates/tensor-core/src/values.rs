// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dense value containers, one variant per [`DType`].
//!
//! Two flavours exist because strings cross the backend boundary as raw
//! bytes but are handed to callers decoded:
//!
//! | type           | strings stored as | used by                          |
//! |----------------|-------------------|----------------------------------|
//! | [`DataValues`] | `Vec<u8>` each    | trackers/backends, `bytes()`     |
//! | [`TensorData`] | `String` each     | `data()`, [`crate::TensorBuffer`] |
//!
//! Complex numbers are interleaved `(re, im)` pairs in both, so the backing
//! `Vec<f32>` is twice the element count.

use crate::{cast, DType, TensorError};
use std::fmt;

/// Backend-resident values for one tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValues {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    /// One byte per element, `0` or `1`.
    Bool(Vec<u8>),
    /// Raw (normally UTF-8) bytes per element.
    String(Vec<Vec<u8>>),
    /// Interleaved `(re, im)` pairs.
    Complex64(Vec<f32>),
}

impl DataValues {
    /// Allocates a zero-filled container for `size` elements.
    pub fn zeros(dtype: DType, size: usize) -> Self {
        match dtype {
            DType::Float32 => DataValues::Float32(vec![0.0; size]),
            DType::Int32 => DataValues::Int32(vec![0; size]),
            DType::Bool => DataValues::Bool(vec![0; size]),
            DType::String => DataValues::String(vec![Vec::new(); size]),
            DType::Complex64 => DataValues::Complex64(vec![0.0; size * 2]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            DataValues::Float32(_) => DType::Float32,
            DataValues::Int32(_) => DType::Int32,
            DataValues::Bool(_) => DType::Bool,
            DataValues::String(_) => DType::String,
            DataValues::Complex64(_) => DType::Complex64,
        }
    }

    /// Number of logical elements (complex pairs count once).
    pub fn len(&self) -> usize {
        match self {
            DataValues::Float32(v) => v.len(),
            DataValues::Int32(v) => v.len(),
            DataValues::Bool(v) => v.len(),
            DataValues::String(v) => v.len(),
            DataValues::Complex64(v) => v.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by this container. Strings count their encoded lengths.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataValues::String(v) => v.iter().map(Vec::len).sum(),
            other => other.len() * other.dtype().bytes_per_element().unwrap_or(0),
        }
    }

    /// Decodes string bytes as UTF-8; numeric variants pass through.
    pub fn decode(self) -> Result<TensorData, TensorError> {
        Ok(match self {
            DataValues::Float32(v) => TensorData::Float32(v),
            DataValues::Int32(v) => TensorData::Int32(v),
            DataValues::Bool(v) => TensorData::Bool(v),
            DataValues::Complex64(v) => TensorData::Complex64(v),
            DataValues::String(v) => TensorData::String(
                v.into_iter()
                    .map(|b| String::from_utf8(b).map_err(|_| TensorError::Decode))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }

    /// Raw byte view: per-element bytes for strings, otherwise the flat
    /// little-endian reinterpretation of the numeric array.
    pub fn to_bytes(&self) -> TensorBytes {
        match self {
            DataValues::Float32(v) | DataValues::Complex64(v) => {
                TensorBytes::Flat(v.iter().flat_map(|x| x.to_le_bytes()).collect())
            }
            DataValues::Int32(v) => {
                TensorBytes::Flat(v.iter().flat_map(|x| x.to_le_bytes()).collect())
            }
            DataValues::Bool(v) => TensorBytes::Flat(v.clone()),
            DataValues::String(v) => TensorBytes::Strings(v.clone()),
        }
    }
}

/// Decoded values, as returned by [`crate::Tensor::data`].
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    /// One byte per element, `0` or `1`.
    Bool(Vec<u8>),
    String(Vec<String>),
    /// Interleaved `(re, im)` pairs.
    Complex64(Vec<f32>),
}

impl TensorData {
    /// Allocates a zero-filled container for `size` elements.
    pub fn zeros(dtype: DType, size: usize) -> Self {
        match dtype {
            DType::Float32 => TensorData::Float32(vec![0.0; size]),
            DType::Int32 => TensorData::Int32(vec![0; size]),
            DType::Bool => TensorData::Bool(vec![0; size]),
            DType::String => TensorData::String(vec![String::new(); size]),
            DType::Complex64 => TensorData::Complex64(vec![0.0; size * 2]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            TensorData::Float32(_) => DType::Float32,
            TensorData::Int32(_) => DType::Int32,
            TensorData::Bool(_) => DType::Bool,
            TensorData::String(_) => DType::String,
            TensorData::Complex64(_) => DType::Complex64,
        }
    }

    /// Number of logical elements (complex pairs count once).
    pub fn len(&self) -> usize {
        match self {
            TensorData::Float32(v) => v.len(),
            TensorData::Int32(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::String(v) => v.len(),
            TensorData::Complex64(v) => v.len() / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads element `index`. Panics if out of bounds; callers check.
    pub fn get(&self, index: usize) -> Scalar {
        match self {
            TensorData::Float32(v) => Scalar::Float(v[index]),
            TensorData::Int32(v) => Scalar::Int(v[index]),
            TensorData::Bool(v) => Scalar::Bool(v[index] != 0),
            TensorData::String(v) => Scalar::Str(v[index].clone()),
            TensorData::Complex64(v) => Scalar::Complex(v[2 * index], v[2 * index + 1]),
        }
    }

    /// Writes element `index`, coercing `value` to this container's dtype.
    pub fn set(&mut self, index: usize, value: Scalar) -> Result<(), TensorError> {
        let dtype = self.dtype();
        let mismatch = |value: &Scalar| TensorError::ValueType {
            dtype,
            value: value.to_string(),
        };
        match self {
            TensorData::String(v) => match value {
                Scalar::Str(s) => v[index] = s,
                other => return Err(mismatch(&other)),
            },
            TensorData::Complex64(v) => match value {
                Scalar::Complex(re, im) => {
                    v[2 * index] = re;
                    v[2 * index + 1] = im;
                }
                other => {
                    let re = other.as_f64().ok_or_else(|| mismatch(&other))?;
                    v[2 * index] = re as f32;
                    v[2 * index + 1] = 0.0;
                }
            },
            TensorData::Float32(v) => {
                v[index] = value.as_f64().ok_or_else(|| mismatch(&value))? as f32;
            }
            TensorData::Int32(v) => {
                v[index] = cast::number_to_int32(value.as_f64().ok_or_else(|| mismatch(&value))?);
            }
            TensorData::Bool(v) => {
                v[index] = cast::number_to_bool(value.as_f64().ok_or_else(|| mismatch(&value))?);
            }
        }
        Ok(())
    }

    /// Re-encodes strings to bytes for handing to a tracker.
    pub fn encode(self) -> DataValues {
        match self {
            TensorData::Float32(v) => DataValues::Float32(v),
            TensorData::Int32(v) => DataValues::Int32(v),
            TensorData::Bool(v) => DataValues::Bool(v),
            TensorData::Complex64(v) => DataValues::Complex64(v),
            TensorData::String(v) => {
                DataValues::String(v.into_iter().map(String::into_bytes).collect())
            }
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            TensorData::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            TensorData::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<Vec<bool>> {
        match self {
            TensorData::Bool(v) => Some(v.iter().map(|&b| b != 0).collect()),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            TensorData::String(v) => Some(v),
            _ => None,
        }
    }

    /// Interleaved `(re, im)` storage of a complex64 tensor.
    pub fn as_complex(&self) -> Option<&[f32]> {
        match self {
            TensorData::Complex64(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for TensorData {
    fn from(v: Vec<f32>) -> Self {
        TensorData::Float32(v)
    }
}

impl From<Vec<i32>> for TensorData {
    fn from(v: Vec<i32>) -> Self {
        TensorData::Int32(v)
    }
}

impl From<Vec<bool>> for TensorData {
    fn from(v: Vec<bool>) -> Self {
        TensorData::Bool(v.into_iter().map(u8::from).collect())
    }
}

impl From<Vec<String>> for TensorData {
    fn from(v: Vec<String>) -> Self {
        TensorData::String(v)
    }
}

impl From<Vec<&str>> for TensorData {
    fn from(v: Vec<&str>) -> Self {
        TensorData::String(v.into_iter().map(str::to_string).collect())
    }
}

/// A single element, as read from or written to a [`crate::TensorBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Float(f32),
    Int(i32),
    Bool(bool),
    Str(String),
    Complex(f32, f32),
}

impl Scalar {
    /// Numeric view used for coercion; `None` for strings and complex pairs.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Float(v) => Some(v as f64),
            Scalar::Int(v) => Some(v as f64),
            Scalar::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
            Scalar::Str(_) | Scalar::Complex(..) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Str(s) => write!(f, "'{s}'"),
            Scalar::Complex(re, im) => write!(f, "{re} + {im}j"),
        }
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// Raw bytes returned by [`crate::Tensor::bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TensorBytes {
    /// Byte-level reinterpretation of a numeric backing array.
    Flat(Vec<u8>),
    /// Undecoded bytes, one entry per string element.
    Strings(Vec<Vec<u8>>),
}
