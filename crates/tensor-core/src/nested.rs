// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Nested-array tensor input and output.
//!
//! Callers describe tensor contents as arbitrarily deep lists of numbers,
//! booleans or strings, optionally with flat typed arrays as rows. This
//! module infers the shape and dtype of such input, checks that it is not
//! ragged, and flattens it into a [`DataValues`] container. It also does the
//! reverse: re-nests a flat container by shape for `array()`.

use crate::{cast, DType, DataValues, TensorData, TensorError};

/// A flat, homogeneously typed row inside a nested input.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedArray {
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    /// Unsigned bytes; for string tensors this is one encoded string.
    Uint8(Vec<u8>),
}

impl TypedArray {
    pub fn len(&self) -> usize {
        match self {
            TypedArray::Float32(v) => v.len(),
            TypedArray::Int32(v) => v.len(),
            TypedArray::Uint8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn numbers(&self) -> Vec<f64> {
        match self {
            TypedArray::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            TypedArray::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            TypedArray::Uint8(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}

/// Tensor contents as a (possibly nested) literal.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedArray {
    /// An absent value; always rejected as tensor input.
    Null,
    Number(f64),
    Bool(bool),
    Str(String),
    List(Vec<NestedArray>),
    Typed(TypedArray),
}

impl NestedArray {
    /// Parses JSON text (`[[1, 2], [3, 4]]`, `"abc"`, `true`, ...).
    pub fn from_json(text: &str) -> Result<Self, TensorError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| TensorError::InvalidArgument(format!("invalid JSON tensor literal: {e}")))?;
        Self::try_from(value)
    }

    /// Renders as JSON. Non-finite numbers become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        let number = |x: f64| {
            serde_json::Number::from_f64(x)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        };
        match self {
            NestedArray::Null => Value::Null,
            NestedArray::Number(x) => number(*x),
            NestedArray::Bool(b) => Value::Bool(*b),
            NestedArray::Str(s) => Value::String(s.clone()),
            NestedArray::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            NestedArray::Typed(t) => Value::Array(t.numbers().into_iter().map(number).collect()),
        }
    }

    fn is_array(&self) -> bool {
        matches!(self, NestedArray::List(_) | NestedArray::Typed(_))
    }
}

impl TryFrom<serde_json::Value> for NestedArray {
    type Error = TensorError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        Ok(match value {
            Value::Null => NestedArray::Null,
            Value::Bool(b) => NestedArray::Bool(b),
            Value::Number(n) => NestedArray::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => NestedArray::Str(s),
            Value::Array(items) => NestedArray::List(
                items
                    .into_iter()
                    .map(NestedArray::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => {
                return Err(TensorError::InvalidArgument(
                    "objects are not valid tensor values".into(),
                ))
            }
        })
    }
}

impl From<f64> for NestedArray {
    fn from(v: f64) -> Self {
        NestedArray::Number(v)
    }
}

impl From<f32> for NestedArray {
    fn from(v: f32) -> Self {
        NestedArray::Number(v as f64)
    }
}

impl From<i32> for NestedArray {
    fn from(v: i32) -> Self {
        NestedArray::Number(v as f64)
    }
}

impl From<bool> for NestedArray {
    fn from(v: bool) -> Self {
        NestedArray::Bool(v)
    }
}

impl From<&str> for NestedArray {
    fn from(v: &str) -> Self {
        NestedArray::Str(v.to_string())
    }
}

impl From<String> for NestedArray {
    fn from(v: String) -> Self {
        NestedArray::Str(v)
    }
}

impl From<TypedArray> for NestedArray {
    fn from(v: TypedArray) -> Self {
        NestedArray::Typed(v)
    }
}

impl<T: Into<NestedArray>> From<Vec<T>> for NestedArray {
    fn from(v: Vec<T>) -> Self {
        NestedArray::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<NestedArray>, const N: usize> From<[T; N]> for NestedArray {
    fn from(v: [T; N]) -> Self {
        NestedArray::List(v.into_iter().map(Into::into).collect())
    }
}

/// Infers the shape of `values` by walking first elements.
///
/// With `check_consistency`, every element is then verified against the
/// inferred shape, rejecting ragged input.
pub fn infer_shape(
    values: &NestedArray,
    dtype: DType,
    check_consistency: bool,
) -> Result<Vec<usize>, TensorError> {
    if let NestedArray::Typed(t) = values {
        return Ok(if dtype == DType::String {
            Vec::new()
        } else {
            vec![t.len()]
        });
    }
    if !matches!(values, NestedArray::List(_)) {
        return Ok(Vec::new());
    }

    let mut shape = Vec::new();
    let mut first = values;
    loop {
        match first {
            NestedArray::List(items) => {
                shape.push(items.len());
                match items.first() {
                    Some(next) => first = next,
                    None => break,
                }
            }
            NestedArray::Typed(t) if dtype != DType::String => {
                shape.push(t.len());
                break;
            }
            _ => break,
        }
    }

    if check_consistency {
        assert_shape_consistency(values, &shape, dtype, &mut Vec::new())?;
    }
    Ok(shape)
}

fn assert_shape_consistency(
    val: &NestedArray,
    shape: &[usize],
    dtype: DType,
    indices: &mut Vec<usize>,
) -> Result<(), TensorError> {
    let is_leaf = !val.is_array() || (dtype == DType::String && matches!(val, NestedArray::Typed(_)));

    if is_leaf {
        if let Some(&expected) = shape.first() {
            return Err(TensorError::RaggedArray(format!(
                "Element arr[{}] is a primitive, but should be an array/TypedArray of {expected} elements",
                path(indices)
            )));
        }
        return Ok(());
    }

    let len = match val {
        NestedArray::List(items) => items.len(),
        NestedArray::Typed(t) => t.len(),
        _ => 0,
    };
    let Some(&expected) = shape.first() else {
        return Err(TensorError::RaggedArray(format!(
            "Element arr[{}] should be a primitive, but is an array of {len} elements",
            path(indices)
        )));
    };
    if len != expected {
        return Err(TensorError::RaggedArray(format!(
            "Element arr[{}] should have {expected} elements, but has {len} elements",
            path(indices)
        )));
    }

    let sub_shape = &shape[1..];
    match val {
        NestedArray::List(items) => {
            for (i, item) in items.iter().enumerate() {
                indices.push(i);
                let result = assert_shape_consistency(item, sub_shape, dtype, indices);
                indices.pop();
                result?;
            }
        }
        NestedArray::Typed(_) => {
            // Typed array elements are primitives.
            if let Some(&inner) = sub_shape.first() {
                indices.push(0);
                let msg = format!(
                    "Element arr[{}] is a primitive, but should be an array/TypedArray of {inner} elements",
                    path(indices)
                );
                indices.pop();
                return Err(TensorError::RaggedArray(msg));
            }
        }
        _ => {}
    }
    Ok(())
}

fn path(indices: &[usize]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("][")
}

/// Infers the dtype of `values`: bool → bool, string → string, typed arrays
/// by their element type, everything else float32.
pub fn infer_dtype(values: &NestedArray) -> DType {
    match values {
        NestedArray::Typed(TypedArray::Float32(_)) => DType::Float32,
        NestedArray::Typed(TypedArray::Int32(_) | TypedArray::Uint8(_)) => DType::Int32,
        NestedArray::Bool(_) => DType::Bool,
        NestedArray::Str(_) => DType::String,
        NestedArray::Number(_) | NestedArray::Null => DType::Float32,
        NestedArray::List(items) => items.first().map(infer_dtype).unwrap_or(DType::Float32),
    }
}

enum Leaf<'a> {
    Number(f64),
    Bool(bool),
    Str(&'a str),
    Bytes(&'a [u8]),
}

fn collect_leaves<'a>(
    val: &'a NestedArray,
    dtype: DType,
    out: &mut Vec<Leaf<'a>>,
) -> Result<(), TensorError> {
    match val {
        NestedArray::Null => return Err(TensorError::NullInput),
        NestedArray::Number(x) => out.push(Leaf::Number(*x)),
        NestedArray::Bool(b) => out.push(Leaf::Bool(*b)),
        NestedArray::Str(s) => out.push(Leaf::Str(s)),
        NestedArray::List(items) => {
            for item in items {
                collect_leaves(item, dtype, out)?;
            }
        }
        NestedArray::Typed(TypedArray::Uint8(bytes)) if dtype == DType::String => {
            out.push(Leaf::Bytes(bytes));
        }
        NestedArray::Typed(_) if dtype == DType::String => {
            return Err(TensorError::InvalidArgument(
                "when making a string tensor from typed arrays, each value must be a Uint8Array"
                    .into(),
            ))
        }
        NestedArray::Typed(t) => out.extend(t.numbers().into_iter().map(Leaf::Number)),
    }
    Ok(())
}

/// Flattens `values` in row-major order and coerces every leaf to `dtype`.
///
/// With `debug`, NaN/±Infinity uploads into float32/int32 are rejected.
pub fn flatten(values: &NestedArray, dtype: DType, debug: bool) -> Result<DataValues, TensorError> {
    let mut leaves = Vec::new();
    collect_leaves(values, dtype, &mut leaves)?;

    let wrong = |leaf: &Leaf<'_>| TensorError::ValueType {
        dtype,
        value: match leaf {
            Leaf::Number(x) => x.to_string(),
            Leaf::Bool(b) => b.to_string(),
            Leaf::Str(s) => format!("'{s}'"),
            Leaf::Bytes(b) => format!("{} raw bytes", b.len()),
        },
    };
    let number = |leaf: &Leaf<'_>| -> Result<f64, TensorError> {
        let x = match leaf {
            Leaf::Number(x) => *x,
            Leaf::Bool(b) => f64::from(u8::from(*b)),
            other => return Err(wrong(other)),
        };
        if debug {
            cast::check_upload(dtype, x)?;
        }
        Ok(x)
    };

    Ok(match dtype {
        DType::String => DataValues::String(
            leaves
                .iter()
                .map(|leaf| match leaf {
                    Leaf::Str(s) => Ok(s.as_bytes().to_vec()),
                    Leaf::Bytes(b) => Ok(b.to_vec()),
                    other => Err(wrong(other)),
                })
                .collect::<Result<_, _>>()?,
        ),
        DType::Float32 => DataValues::Float32(
            leaves
                .iter()
                .map(|l| number(l).map(|x| x as f32))
                .collect::<Result<_, _>>()?,
        ),
        DType::Int32 => DataValues::Int32(
            leaves
                .iter()
                .map(|l| number(l).map(cast::number_to_int32))
                .collect::<Result<_, _>>()?,
        ),
        DType::Bool => DataValues::Bool(
            leaves
                .iter()
                .map(|l| number(l).map(cast::number_to_bool))
                .collect::<Result<_, _>>()?,
        ),
        DType::Complex64 => return Err(TensorError::ComplexConstruction),
    })
}

/// Re-nests flat values according to `shape`.
///
/// Complex tensors double the trailing dimension with interleaved
/// `(re, im)` numbers; a complex scalar becomes `[re, im]`.
pub fn to_nested_array(shape: &[usize], data: &TensorData) -> Result<NestedArray, TensorError> {
    let is_complex = data.dtype() == DType::Complex64;
    let leaves: Vec<NestedArray> = match data {
        TensorData::Float32(v) | TensorData::Complex64(v) => {
            v.iter().map(|&x| NestedArray::Number(x as f64)).collect()
        }
        TensorData::Int32(v) => v.iter().map(|&x| NestedArray::Number(x as f64)).collect(),
        TensorData::Bool(v) => v.iter().map(|&b| NestedArray::Bool(b != 0)).collect(),
        TensorData::String(v) => v.iter().cloned().map(NestedArray::Str).collect(),
    };

    if shape.is_empty() {
        if is_complex {
            return Ok(NestedArray::List(leaves));
        }
        return leaves.into_iter().next().ok_or(TensorError::ValueCountMismatch {
            expected: 1,
            actual: 0,
        });
    }

    let factor = if is_complex { 2 } else { 1 };
    let size = shape.iter().product::<usize>() * factor;
    if size == 0 {
        return Ok(NestedArray::List(Vec::new()));
    }
    if size != leaves.len() {
        return Err(TensorError::ValueCountMismatch {
            expected: size,
            actual: leaves.len(),
        });
    }
    Ok(create_nested(0, shape, &leaves, factor))
}

fn create_nested(offset: usize, shape: &[usize], leaves: &[NestedArray], factor: usize) -> NestedArray {
    if shape.len() == 1 {
        let d = shape[0] * factor;
        return NestedArray::List(leaves[offset..offset + d].to_vec());
    }
    let rest = &shape[1..];
    let len = rest.iter().product::<usize>() * factor;
    NestedArray::List(
        (0..shape[0])
            .map(|i| create_nested(offset + i * len, rest, leaves, factor))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_shape_nested() {
        let v: NestedArray = vec![vec![1, 2, 3], vec![4, 5, 6]].into();
        assert_eq!(infer_shape(&v, DType::Float32, true).unwrap(), vec![2, 3]);
        assert_eq!(infer_shape(&NestedArray::Number(3.0), DType::Float32, true).unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_infer_shape_typed_rows() {
        let v = NestedArray::List(vec![
            TypedArray::Float32(vec![1.0, 2.0]).into(),
            TypedArray::Float32(vec![3.0, 4.0]).into(),
        ]);
        assert_eq!(infer_shape(&v, DType::Float32, true).unwrap(), vec![2, 2]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let v: NestedArray = vec![vec![1, 2, 3], vec![4, 5]].into();
        let err = infer_shape(&v, DType::Float32, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Element arr[1] should have 3 elements, but has 2 elements"
        );
    }

    #[test]
    fn test_ragged_typed_row_rejected() {
        let v = NestedArray::List(vec![
            TypedArray::Int32(vec![1, 2]).into(),
            TypedArray::Int32(vec![3]).into(),
        ]);
        let err = infer_shape(&v, DType::Int32, true).unwrap_err();
        assert!(err.to_string().contains("should have 2 elements, but has 1 elements"));
    }

    #[test]
    fn test_mixed_depth_rejected() {
        let v = NestedArray::List(vec![vec![1, 2].into(), NestedArray::Number(3.0)]);
        let err = infer_shape(&v, DType::Float32, true).unwrap_err();
        assert!(err.to_string().starts_with("Element arr[1] is a primitive"));

        let v = NestedArray::List(vec![NestedArray::Number(3.0), vec![1, 2].into()]);
        let err = infer_shape(&v, DType::Float32, true).unwrap_err();
        assert!(err.to_string().contains("should be a primitive, but is an array of 2 elements"));
    }

    #[test]
    fn test_consistency_check_can_be_disabled() {
        let v: NestedArray = vec![vec![1, 2, 3], vec![4, 5]].into();
        assert_eq!(infer_shape(&v, DType::Float32, false).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_infer_dtype() {
        assert_eq!(infer_dtype(&vec![true, false].into()), DType::Bool);
        assert_eq!(infer_dtype(&vec!["a"].into()), DType::String);
        assert_eq!(infer_dtype(&vec![1.5].into()), DType::Float32);
        assert_eq!(infer_dtype(&TypedArray::Int32(vec![1]).into()), DType::Int32);
        assert_eq!(infer_dtype(&NestedArray::List(vec![])), DType::Float32);
    }

    #[test]
    fn test_flatten_coerces() {
        let v: NestedArray = vec![vec![1.9, -1.9], vec![0.0, 2.0]].into();
        assert_eq!(
            flatten(&v, DType::Int32, false).unwrap(),
            DataValues::Int32(vec![1, -1, 0, 2])
        );
        assert_eq!(
            flatten(&v, DType::Bool, false).unwrap(),
            DataValues::Bool(vec![1, 1, 0, 1])
        );
    }

    #[test]
    fn test_flatten_debug_rejects_nan() {
        let v: NestedArray = vec![1.0, f64::NAN].into();
        assert!(flatten(&v, DType::Float32, false).is_ok());
        assert!(matches!(
            flatten(&v, DType::Float32, true),
            Err(TensorError::InvalidUpload { .. })
        ));
    }

    #[test]
    fn test_flatten_strings() {
        let v: NestedArray = vec!["a", "bc"].into();
        assert_eq!(
            flatten(&v, DType::String, false).unwrap(),
            DataValues::String(vec![b"a".to_vec(), b"bc".to_vec()])
        );
        assert!(flatten(&vec![1].into(), DType::String, false).is_err());
    }

    #[test]
    fn test_nested_null_rejected() {
        let v = NestedArray::List(vec![NestedArray::Number(1.0), NestedArray::Null]);
        assert_eq!(flatten(&v, DType::Float32, false), Err(TensorError::NullInput));
    }

    #[test]
    fn test_from_json() {
        let v = NestedArray::from_json("[[1, 2], [3, 4]]").unwrap();
        assert_eq!(infer_shape(&v, DType::Float32, true).unwrap(), vec![2, 2]);
        assert_eq!(NestedArray::from_json("null").unwrap(), NestedArray::Null);
        assert!(NestedArray::from_json("{\"a\": 1}").is_err());
    }

    #[test]
    fn test_to_nested_array() {
        let data = TensorData::Int32(vec![1, 2, 3, 4, 5, 6]);
        let nested = to_nested_array(&[2, 3], &data).unwrap();
        let expected: NestedArray = vec![vec![1, 2, 3], vec![4, 5, 6]].into();
        assert_eq!(nested, expected);
    }

    #[test]
    fn test_to_nested_array_complex_doubles_last_dim() {
        let data = TensorData::Complex64(vec![1.0, 2.0, 3.0, 4.0]);
        let nested = to_nested_array(&[2], &data).unwrap();
        let expected: NestedArray = vec![1, 2, 3, 4].into();
        assert_eq!(nested, expected);
        let scalar = to_nested_array(&[], &TensorData::Complex64(vec![5.0, 6.0])).unwrap();
        assert_eq!(scalar, vec![5, 6].into());
    }

    #[test]
    fn test_to_nested_array_scalar_and_empty() {
        let s = to_nested_array(&[], &TensorData::Bool(vec![1])).unwrap();
        assert_eq!(s, NestedArray::Bool(true));
        let e = to_nested_array(&[0, 3], &TensorData::Float32(vec![])).unwrap();
        assert_eq!(e, NestedArray::List(vec![]));
    }
}
