// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Mutable, host-resident staging buffer.
//!
//! A [`TensorBuffer`] is where tensor contents are assembled by random
//! coordinate writes before being handed to a tracker with
//! [`TensorBuffer::to_tensor`]. It is plain memory: nothing to dispose.

use crate::shape::{compute_strides, index_to_loc, loc_to_index};
use crate::{Context, DType, Scalar, Shape, Tensor, TensorData, TensorError};

/// A dense N-dimensional array with coordinate-indexed `get`/`set`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorBuffer {
    shape: Shape,
    dtype: DType,
    strides: Vec<usize>,
    size: usize,
    values: TensorData,
}

impl TensorBuffer {
    /// Creates a buffer, zero-filled unless `values` are supplied.
    ///
    /// # Errors
    /// - [`TensorError::ComplexBuffer`] for `complex64`, always. Build the
    ///   real and imaginary parts separately and combine them with
    ///   [`Context::complex`].
    /// - [`TensorError::ValueCountMismatch`] if `values` does not hold
    ///   exactly `shape.num_elements()` elements.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Scalar, TensorBuffer};
    /// let mut b = TensorBuffer::new([2, 2], DType::Float32, None).unwrap();
    /// b.set(3.0f32, &[1, 0]).unwrap();
    /// assert_eq!(b.get(&[1, 0]).unwrap(), Scalar::Float(3.0));
    /// ```
    pub fn new(
        shape: impl Into<Shape>,
        dtype: DType,
        values: Option<TensorData>,
    ) -> Result<Self, TensorError> {
        if dtype == DType::Complex64 {
            return Err(TensorError::ComplexBuffer);
        }
        let shape = shape.into();
        let size = shape.num_elements();
        let values = match values {
            Some(values) => {
                if values.len() != size {
                    return Err(TensorError::ValueCountMismatch {
                        expected: size,
                        actual: values.len(),
                    });
                }
                if values.dtype() != dtype {
                    return Err(TensorError::Cast {
                        from: values.dtype(),
                        to: dtype,
                        detail: "buffer values must already have the buffer's dtype".into(),
                    });
                }
                values
            }
            None => TensorData::zeros(dtype, size),
        };
        Ok(Self {
            strides: compute_strides(shape.dims()),
            shape,
            dtype,
            size,
            values,
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Borrows the flat row-major values.
    pub fn values(&self) -> &TensorData {
        &self.values
    }

    /// Consumes the buffer, returning its values.
    pub fn into_values(self) -> TensorData {
        self.values
    }

    /// Writes `value` at `locs`, coercing it to the buffer's dtype.
    ///
    /// Empty `locs` address the first element (`[0]`, or `[]` on a scalar
    /// buffer).
    pub fn set(&mut self, value: impl Into<Scalar>, locs: &[usize]) -> Result<(), TensorError> {
        let index = self.checked_index(locs, true)?;
        self.values.set(index, value.into())
    }

    /// Reads the element at `locs`.
    ///
    /// Empty `locs` address the first element. Fewer coordinates than the
    /// rank are combined with the leading strides, so `get(&[1])` on a
    /// `[2, 3]` buffer reads flat offset 1.
    pub fn get(&self, locs: &[usize]) -> Result<Scalar, TensorError> {
        let index = self.checked_index(locs, false)?;
        Ok(self.values.get(index))
    }

    /// Flat offset of `locs`; unchecked.
    pub fn loc_to_index(&self, locs: &[usize]) -> usize {
        loc_to_index(locs, self.rank(), &self.strides)
    }

    /// Coordinates of flat offset `index`; unchecked.
    pub fn index_to_loc(&self, index: usize) -> Vec<usize> {
        index_to_loc(index, self.rank(), &self.strides)
    }

    /// Hands a copy of the values to the tracker, which returns a newly
    /// registered tensor of the same shape and dtype.
    pub fn to_tensor(&self, ctx: &Context) -> Result<Tensor, TensorError> {
        ctx.make_tensor(self.values.clone().encode(), self.shape.clone())
    }

    fn checked_index(&self, locs: &[usize], check_rank: bool) -> Result<usize, TensorError> {
        if locs.is_empty() && self.rank() == 0 {
            return Ok(0);
        }
        let locs: &[usize] = if locs.is_empty() { &[0] } else { locs };
        if (check_rank || locs.len() > self.rank()) && locs.len() != self.rank() {
            return Err(TensorError::RankMismatch {
                rank: self.rank(),
                actual: locs.len(),
            });
        }
        let in_bounds = locs
            .iter()
            .zip(self.shape.dims())
            .all(|(&loc, &dim)| loc < dim);
        if !in_bounds {
            return Err(TensorError::OutOfRange {
                locs: locs.to_vec(),
                shape: self.shape.clone(),
            });
        }
        // Partial coordinates on read use the leading strides only:
        // `locs[last] + Σ strides[i] * locs[i]`.
        Ok(loc_to_index(locs, locs.len(), &self.strides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_filled() {
        let b = TensorBuffer::new([2, 3], DType::Int32, None).unwrap();
        assert_eq!(b.size(), 6);
        assert_eq!(b.strides(), &[3]);
        assert_eq!(b.values(), &TensorData::Int32(vec![0; 6]));
    }

    #[test]
    fn test_complex_always_rejected() {
        assert_eq!(
            TensorBuffer::new([2], DType::Complex64, None),
            Err(TensorError::ComplexBuffer)
        );
        assert_eq!(
            TensorBuffer::new(Shape::scalar(), DType::Complex64, None),
            Err(TensorError::ComplexBuffer)
        );
        let vals = Some(TensorData::Complex64(vec![1.0, 2.0]));
        assert_eq!(
            TensorBuffer::new([1], DType::Complex64, vals),
            Err(TensorError::ComplexBuffer)
        );
    }

    #[test]
    fn test_value_count_mismatch() {
        let err = TensorBuffer::new([2, 2], DType::Float32, Some(vec![1.0f32; 3].into()))
            .unwrap_err();
        assert_eq!(
            err,
            TensorError::ValueCountMismatch {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut b = TensorBuffer::new([3, 2, 2], DType::Float32, None).unwrap();
        b.set(7.5f32, &[2, 1, 0]).unwrap();
        assert_eq!(b.get(&[2, 1, 0]).unwrap(), Scalar::Float(7.5));
        assert_eq!(b.loc_to_index(&[2, 1, 0]), 10);
        assert_eq!(b.values().as_f32().unwrap()[10], 7.5);
    }

    #[test]
    fn test_index_to_loc_rank3() {
        let b = TensorBuffer::new([3, 2, 2], DType::Float32, None).unwrap();
        assert_eq!(b.index_to_loc(5), vec![1, 0, 1]);
        assert_eq!(b.index_to_loc(11), vec![2, 1, 1]);
    }

    #[test]
    fn test_empty_locs_default_to_first() {
        let mut b = TensorBuffer::new([4], DType::Int32, None).unwrap();
        b.set(9, &[]).unwrap();
        assert_eq!(b.get(&[]).unwrap(), Scalar::Int(9));
        assert_eq!(b.get(&[0]).unwrap(), Scalar::Int(9));

        let mut s = TensorBuffer::new(Shape::scalar(), DType::Bool, None).unwrap();
        s.set(true, &[]).unwrap();
        assert_eq!(s.get(&[]).unwrap(), Scalar::Bool(true));
    }

    #[test]
    fn test_set_rank_mismatch() {
        let mut b = TensorBuffer::new([2, 2], DType::Float32, None).unwrap();
        let err = b.set(1.0f32, &[1]).unwrap_err();
        assert_eq!(err, TensorError::RankMismatch { rank: 2, actual: 1 });
        assert!(err.to_string().contains("(1)"));
        assert!(err.to_string().contains("(2)"));
    }

    #[test]
    fn test_get_out_of_range_names_locs_and_shape() {
        let b = TensorBuffer::new([2, 3], DType::Float32, None).unwrap();
        let err = b.get(&[1, 3]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "requested out of range element at [1, 3]; buffer shape=[2, 3]"
        );
        assert!(b.get(&[0, 0, 0]).is_err());
    }

    #[test]
    fn test_partial_locs_on_get_use_leading_strides() {
        let values: Vec<i32> = (0..6).collect();
        let b = TensorBuffer::new([2, 3], DType::Int32, Some(values.into())).unwrap();
        assert_eq!(b.get(&[1]).unwrap(), Scalar::Int(1));
        assert!(b.get(&[2]).is_err());

        let values: Vec<i32> = (0..12).collect();
        let b = TensorBuffer::new([3, 2, 2], DType::Int32, Some(values.into())).unwrap();
        assert_eq!(b.get(&[1, 1]).unwrap(), Scalar::Int(5));
    }

    #[test]
    fn test_string_buffer() {
        let mut b = TensorBuffer::new([2], DType::String, None).unwrap();
        b.set("hello", &[1]).unwrap();
        assert_eq!(b.get(&[1]).unwrap(), Scalar::Str("hello".into()));
        assert!(b.set(1.0f32, &[0]).is_err());
    }
}
