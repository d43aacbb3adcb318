// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor factories on [`Context`].
//!
//! All of them funnel into one routine that validates an optional explicit
//! shape against the shape inferred from the nested input, flattens the
//! input, and uploads it through the context's tracker.

use crate::nested::{self, NestedArray};
use crate::shape::size_from_shape;
use crate::{Context, DType, DataValues, Shape, Tensor, TensorBuffer, TensorData, TensorError};

const RANK_WORDS: [&str; 7] = ["zero", "one", "two", "three", "four", "five", "six"];

impl Context {
    /// Creates a tensor from a nested literal.
    ///
    /// Without `dtype`, bool and string literals keep their type and
    /// everything else becomes `float32`. With `shape`, flat input is laid
    /// out in that shape.
    ///
    /// ```ignore
    /// let t = ctx.tensor(vec![vec![1, 2], vec![3, 4]], None, None)?;
    /// assert_eq!(t.shape().dims(), &[2, 2]);
    /// ```
    pub fn tensor(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        let values = values.into();
        let inferred = self.infer_shape(&values, dtype)?;
        self.make_tensor_from_literal(&values, shape, &inferred, dtype)
    }

    /// Creates a rank-0 tensor from a primitive.
    ///
    /// A [`crate::TypedArray::Uint8`] is accepted only for `string` dtype,
    /// as the encoded bytes of the single string.
    pub fn scalar(
        &self,
        value: impl Into<NestedArray>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        let value = value.into();
        match (&value, dtype) {
            (NestedArray::Typed(nested::TypedArray::Uint8(_)), Some(DType::String)) => {}
            (NestedArray::Typed(_), Some(DType::String)) => {
                return Err(TensorError::InvalidArgument(
                    "when making a scalar from encoded string, the value must be a Uint8Array"
                        .into(),
                ))
            }
            (NestedArray::List(_) | NestedArray::Typed(_), _) => {
                return Err(TensorError::InvalidArgument(
                    "error creating a new Scalar: value must be a primitive (number|boolean|string)"
                        .into(),
                ))
            }
            _ => {}
        }
        self.make_tensor_from_literal(&value, Some(&[] as &[usize]), &[], dtype)
    }

    /// Creates a rank-1 tensor. Input must be flat.
    pub fn tensor1d(
        &self,
        values: impl Into<NestedArray>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        let values = values.into();
        let inferred = self.infer_shape(&values, dtype)?;
        if inferred.len() != 1 {
            return Err(TensorError::InvalidArgument(
                "tensor1d() requires values to be a flat/TypedArray".into(),
            ));
        }
        self.make_tensor_from_literal(&values, None, &inferred, dtype)
    }

    pub fn tensor2d(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        self.tensor_nd(2, values.into(), shape, dtype)
    }

    pub fn tensor3d(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        self.tensor_nd(3, values.into(), shape, dtype)
    }

    pub fn tensor4d(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        self.tensor_nd(4, values.into(), shape, dtype)
    }

    pub fn tensor5d(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        self.tensor_nd(5, values.into(), shape, dtype)
    }

    pub fn tensor6d(
        &self,
        values: impl Into<NestedArray>,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        self.tensor_nd(6, values.into(), shape, dtype)
    }

    /// A zero-filled (or pre-filled) [`TensorBuffer`].
    pub fn buffer(
        &self,
        shape: impl Into<Shape>,
        dtype: DType,
        values: Option<TensorData>,
    ) -> Result<TensorBuffer, TensorError> {
        TensorBuffer::new(shape, dtype, values)
    }

    /// Combines two float32 tensors of equal shape into a complex64 tensor.
    pub fn complex(&self, real: &Tensor, imag: &Tensor) -> Result<Tensor, TensorError> {
        for part in [real, imag] {
            if part.dtype() != DType::Float32 {
                return Err(TensorError::UnsupportedDType {
                    op: "complex",
                    dtype: part.dtype(),
                });
            }
        }
        if real.shape() != imag.shape() {
            return Err(TensorError::ShapeMismatch {
                op: "complex",
                lhs: real.shape().clone(),
                rhs: imag.shape().clone(),
            });
        }
        let re = real.data_sync()?;
        let im = imag.data_sync()?;
        let (Some(re), Some(im)) = (re.as_f32(), im.as_f32()) else {
            return Err(TensorError::Backend {
                op: "complex",
                detail: "float32 tensor returned non-float32 values".into(),
            });
        };
        let interleaved = re.iter().zip(im).flat_map(|(&r, &i)| [r, i]).collect();
        self.make_tensor(DataValues::Complex64(interleaved), real.shape().clone())
    }

    fn infer_shape(
        &self,
        values: &NestedArray,
        dtype: Option<DType>,
    ) -> Result<Vec<usize>, TensorError> {
        if matches!(values, NestedArray::Null) {
            return Err(TensorError::NullInput);
        }
        let dtype = dtype.unwrap_or_else(|| nested::infer_dtype(values));
        nested::infer_shape(values, dtype, self.flags().check_shape_consistency)
    }

    fn tensor_nd(
        &self,
        rank: usize,
        values: NestedArray,
        shape: Option<&[usize]>,
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        let word = RANK_WORDS[rank];
        if let Some(shape) = shape {
            if shape.len() != rank {
                return Err(TensorError::InvalidArgument(format!(
                    "tensor{rank}d() requires shape to have {word} numbers"
                )));
            }
        }
        let inferred = self.infer_shape(&values, dtype)?;
        if inferred.len() != rank && inferred.len() != 1 {
            return Err(TensorError::InvalidArgument(format!(
                "tensor{rank}d() requires values to be number{} or flat/TypedArray",
                "[]".repeat(rank)
            )));
        }
        if inferred.len() == 1 && shape.is_none() {
            return Err(TensorError::InvalidArgument(format!(
                "tensor{rank}d() requires shape to be provided when `values` are a flat/TypedArray"
            )));
        }
        self.make_tensor_from_literal(&values, shape, &inferred, dtype)
    }

    fn make_tensor_from_literal(
        &self,
        values: &NestedArray,
        shape: Option<&[usize]>,
        inferred: &[usize],
        dtype: Option<DType>,
    ) -> Result<Tensor, TensorError> {
        if matches!(values, NestedArray::Null) {
            return Err(TensorError::NullInput);
        }
        let dtype = match dtype {
            Some(DType::Complex64) => return Err(TensorError::ComplexConstruction),
            Some(dtype) => dtype,
            None => nested::infer_dtype(values),
        };
        if let Some(shape) = shape {
            check_provided_shape(shape, inferred)?;
        }
        let shape = Shape::from(shape.unwrap_or(inferred));
        let data = nested::flatten(values, dtype, self.flags().debug)?;
        self.make_tensor(data, shape)
    }
}

/// The provided shape must hold as many values as the input, and agree with
/// the inferred dims everywhere except a flattened trailing dimension.
fn check_provided_shape(provided: &[usize], inferred: &[usize]) -> Result<(), TensorError> {
    let provided_size = size_from_shape(provided);
    let inferred_size = size_from_shape(inferred);
    if provided_size != inferred_size {
        return Err(TensorError::ShapeSizeMismatch {
            shape: Shape::from(provided),
            expected: provided_size,
            actual: inferred_size,
        });
    }
    for (i, &dim) in inferred.iter().enumerate() {
        let flat_dims_match = i == inferred.len() - 1
            && provided.get(i..).map(size_from_shape) == Some(dim);
        if provided.get(i) != Some(&dim) && !flat_dims_match {
            return Err(TensorError::InferredShapeMismatch {
                inferred: Shape::from(inferred),
                provided: Shape::from(provided),
            });
        }
    }
    Ok(())
}
