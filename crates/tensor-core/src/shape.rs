// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shape descriptors and the stride/index arithmetic shared by buffers and
//! tensor handles.
//!
//! Strides are stored in the compact row-major form: one entry per
//! *non-trailing* dimension. The trailing dimension is always contiguous, so
//! its implicit stride of 1 is omitted.
//!
//! ```text
//! shape   [3, 2, 2]
//! strides [4, 2]        (trailing stride 1 omitted)
//! offset  = c[2] + 4*c[0] + 2*c[1]
//! ```
//!
//! The free functions assume an already validated shape and do not bounds
//! check; [`crate::TensorBuffer::get`] is where coordinates are checked.

use std::fmt;

/// Describes the dimensionality of a tensor or buffer.
///
/// Shapes are immutable once created. Dimensions are `usize`, so a negative
/// dimension cannot be represented; a `0` anywhere yields zero elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a new shape from the given dimensions.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// Creates a scalar shape (rank 0).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Creates a 1-D shape.
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Creates a 2-D shape (matrix).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the total number of elements. A scalar shape holds one.
    pub fn num_elements(&self) -> usize {
        size_from_shape(&self.dims)
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Computes the compact row-major strides for this shape.
    pub fn strides(&self) -> Vec<usize> {
        compute_strides(&self.dims)
    }

    /// Converts coordinates to a flat offset. See [`loc_to_index`].
    pub fn loc_to_index(&self, locs: &[usize]) -> usize {
        loc_to_index(locs, self.rank(), &self.strides())
    }

    /// Converts a flat offset to coordinates. See [`index_to_loc`].
    pub fn index_to_loc(&self, index: usize) -> Vec<usize> {
        index_to_loc(index, self.rank(), &self.strides())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Convenience: `Shape::from(vec![2, 3])`.
impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Convenience: `Shape::from(&[2, 3][..])`.
impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.to_vec())
    }
}

/// Product of all dimensions; `1` for the empty (scalar) shape.
pub fn size_from_shape(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Computes compact row-major strides.
///
/// Rank 0 and 1 yield an empty vector. Otherwise the result has `rank - 1`
/// entries with `strides[i] = dims[i+1] * ... * dims[rank-1]`.
pub fn compute_strides(dims: &[usize]) -> Vec<usize> {
    let rank = dims.len();
    if rank < 2 {
        return Vec::new();
    }
    let mut strides = vec![0usize; rank - 1];
    strides[rank - 2] = dims[rank - 1];
    for i in (0..rank - 2).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Maps coordinates to a flat offset: `locs[last] + Σ strides[i] * locs[i]`.
///
/// `locs` must hold exactly `rank` entries (none for a scalar).
pub fn loc_to_index(locs: &[usize], rank: usize, strides: &[usize]) -> usize {
    match rank {
        0 => 0,
        1 => locs[0],
        _ => {
            let mut index = locs[locs.len() - 1];
            for (loc, stride) in locs[..locs.len() - 1].iter().zip(strides) {
                index += stride * loc;
            }
            index
        }
    }
}

/// Inverse of [`loc_to_index`]: recovers coordinates from a flat offset.
pub fn index_to_loc(index: usize, rank: usize, strides: &[usize]) -> Vec<usize> {
    match rank {
        0 => Vec::new(),
        1 => vec![index],
        _ => {
            let mut locs = vec![0usize; rank];
            let mut rest = index;
            for (i, &stride) in strides.iter().enumerate() {
                // A zero stride only occurs when a trailing dim is 0; nothing
                // is addressable then.
                if stride == 0 {
                    break;
                }
                locs[i] = rest / stride;
                rest -= locs[i] * stride;
            }
            locs[rank - 1] = rest;
            locs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert!(s.strides().is_empty());
    }

    #[test]
    fn test_vector_shape() {
        let s = Shape::vector(5);
        assert_eq!(s.rank(), 1);
        assert_eq!(s.num_elements(), 5);
        assert!(s.strides().is_empty());
    }

    #[test]
    fn test_matrix_shape() {
        let s = Shape::matrix(3, 4);
        assert_eq!(s.num_elements(), 12);
        assert_eq!(s.strides(), vec![4]);
    }

    #[test]
    fn test_3d_strides() {
        assert_eq!(compute_strides(&[2, 3, 4]), vec![12, 4]);
        assert_eq!(compute_strides(&[5, 1, 2, 3]), vec![6, 6, 3]);
    }

    #[test]
    fn test_zero_dim_size() {
        assert_eq!(size_from_shape(&[3, 0, 2]), 0);
        assert_eq!(size_from_shape(&[]), 1);
    }

    #[test]
    fn test_index_to_loc_rank3() {
        let s = Shape::new(vec![3, 2, 2]);
        assert_eq!(s.index_to_loc(5), vec![1, 0, 1]);
        assert_eq!(s.index_to_loc(11), vec![2, 1, 1]);
        assert_eq!(s.index_to_loc(0), vec![0, 0, 0]);
    }

    #[test]
    fn test_loc_to_index_rank3() {
        let s = Shape::new(vec![3, 2, 2]);
        assert_eq!(s.loc_to_index(&[1, 0, 1]), 5);
        assert_eq!(s.loc_to_index(&[2, 1, 1]), 11);
    }

    #[test]
    fn test_low_rank_index_math() {
        assert_eq!(Shape::scalar().loc_to_index(&[]), 0);
        assert!(Shape::scalar().index_to_loc(0).is_empty());
        assert_eq!(Shape::vector(7).loc_to_index(&[4]), 4);
        assert_eq!(Shape::vector(7).index_to_loc(4), vec![4]);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Shape::new(vec![2, 3, 4])), "[2, 3, 4]");
        assert_eq!(format!("{}", Shape::scalar()), "[]");
    }

    #[test]
    fn test_from_conversions() {
        let s1: Shape = vec![2, 3].into();
        let s2: Shape = (&[2, 3][..]).into();
        let s3: Shape = [2, 3].into();
        assert_eq!(s1, s2);
        assert_eq!(s2, s3);
    }

    #[test]
    fn test_serde_transparent() {
        let s = Shape::new(vec![2, 3]);
        assert_eq!(serde_json::to_string(&s).unwrap(), "[2,3]");
    }
}
