// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dtype coercion rules.
//!
//! - number → int32 truncates toward zero (`3.9 → 3`, `-3.9 → -3`).
//! - number → bool is C-style truthiness (nonzero → `1`).
//! - real → complex64 gets a zero imaginary part; complex64 → real keeps the
//!   real part.
//! - strings only convert to strings.

use crate::{DType, DataValues, TensorError};

/// Truncates toward zero. NaN maps to 0 and out-of-range values saturate.
pub fn number_to_int32(v: f64) -> i32 {
    v as i32
}

/// Nonzero (including NaN) is `true`.
pub fn number_to_bool(v: f64) -> u8 {
    u8::from(v != 0.0)
}

/// Rejects NaN/±Infinity uploads into numeric tensors. Only consulted when
/// the context runs with the `debug` flag.
pub fn check_upload(dtype: DType, v: f64) -> Result<(), TensorError> {
    if matches!(dtype, DType::Float32 | DType::Int32) && !v.is_finite() {
        return Err(TensorError::InvalidUpload { dtype, value: v });
    }
    Ok(())
}

/// Converts a whole value container to `to`.
///
/// Casting to the current dtype returns the values unchanged.
pub fn cast_values(values: DataValues, to: DType) -> Result<DataValues, TensorError> {
    let from = values.dtype();
    if from == to {
        return Ok(values);
    }
    if from == DType::String || to == DType::String {
        return Err(TensorError::Cast {
            from,
            to,
            detail: "only strings can be casted to strings".into(),
        });
    }

    let real = real_parts(&values);
    Ok(match to {
        DType::Float32 => DataValues::Float32(real.iter().map(|&x| x as f32).collect()),
        DType::Int32 => DataValues::Int32(real.iter().map(|&x| number_to_int32(x)).collect()),
        DType::Bool => DataValues::Bool(real.iter().map(|&x| number_to_bool(x)).collect()),
        DType::Complex64 => {
            DataValues::Complex64(real.iter().flat_map(|&x| [x as f32, 0.0]).collect())
        }
        DType::String => unreachable!("string casts rejected above"),
    })
}

/// Real parts of a numeric container as `f64`; strings yield nothing.
fn real_parts(values: &DataValues) -> Vec<f64> {
    match values {
        DataValues::Float32(v) => v.iter().map(|&x| x as f64).collect(),
        DataValues::Int32(v) => v.iter().map(|&x| x as f64).collect(),
        DataValues::Bool(v) => v.iter().map(|&x| x as f64).collect(),
        DataValues::Complex64(v) => v.chunks_exact(2).map(|c| c[0] as f64).collect(),
        DataValues::String(_) => Vec::new(),
    }
}
