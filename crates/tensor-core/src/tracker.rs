// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The seams between tensor handles and whatever owns their memory.
//!
//! Tensors never touch storage directly. Every handle carries a
//! [`Context`], which bundles two injected trait objects:
//!
//! - a [`TensorTracker`], which owns the backend data behind each
//!   [`DataId`], reference-counts it, and services reads;
//! - an [`OpHandler`], which implements the few operations a handle
//!   exposes but which belong to the operator layer (`cast`, `clone`,
//!   `print`, `buffer`).
//!
//! Passing the context explicitly, rather than through a global registry,
//! lets several independent engines coexist in one process.

use crate::{
    DType, DataValues, Shape, Tensor, TensorBuffer, TensorError, Variable,
};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by [`TensorTracker::read`].
pub type ReadFuture = Pin<Box<dyn Future<Output = Result<DataValues, TensorError>> + Send>>;

/// Opaque key for backend-resident data. Several tensors may share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId {
    index: u32,
    generation: u32,
}

impl DataId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// Packs into a single word so a handle can swap it atomically.
    pub(crate) fn to_bits(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for DataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Context-wide switches consulted during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// Reject NaN/Infinity uploads into numeric tensors.
    pub debug: bool,
    /// Reject ragged nested input.
    pub check_shape_consistency: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            debug: false,
            check_shape_consistency: true,
        }
    }
}

/// Options for [`TensorTracker::read_to_gpu`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpuReadOptions {
    /// Requested `[height, width]` of the texture, if the caller cares.
    pub custom_tex_shape: Option<[usize; 2]>,
}

/// GPU-side resource handed out by a device backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuResource {
    Texture(u64),
    Buffer(u64),
}

/// Result of [`TensorTracker::read_to_gpu`].
///
/// `tensor_ref` keeps the device data alive; dispose it when done.
#[derive(Debug, Clone)]
pub struct GpuData {
    pub tensor_ref: Tensor,
    pub resource: GpuResource,
    pub tex_shape: Option<[usize; 2]>,
}

/// Owner of all backend data and bookkeeping for live tensors.
///
/// Implementations decide where values live and when they are freed. They
/// must tolerate calls from several threads.
pub trait TensorTracker: Send + Sync {
    /// Construction switches for tensors made through this tracker.
    fn flags(&self) -> Flags {
        Flags::default()
    }

    /// Stores `values` and returns a fresh id with one reference.
    fn write(&self, values: DataValues, shape: &Shape) -> Result<DataId, TensorError>;

    /// Records a newly created handle whose data reference was taken by
    /// [`write`](Self::write).
    fn track(&self, tensor: &Tensor);

    /// Takes an extra reference on `tensor`'s data for a new handle.
    fn inc_ref(&self, tensor: &Tensor) -> Result<(), TensorError>;

    /// Drops the reference held by `tensor`.
    fn dispose_tensor(&self, tensor: &Tensor);

    /// Registers a variable under its name. Fails if the name is taken.
    fn register_variable(&self, variable: &Variable) -> Result<(), TensorError>;

    /// Unregisters a variable and drops its data reference.
    fn dispose_variable(&self, variable: &Variable);

    /// A name for a variable created without one.
    fn next_variable_name(&self) -> String;

    /// Asynchronously reads the values behind `data_id`.
    ///
    /// The read must be registered before this returns, so that disposing
    /// the owning tensor before the future is polled does not free the
    /// data out from under it.
    fn read(&self, data_id: DataId) -> ReadFuture;

    /// Reads the values behind `data_id` immediately.
    fn read_sync(&self, data_id: DataId) -> Result<DataValues, TensorError>;

    /// Exposes the data as a device resource, if the backend has one.
    fn read_to_gpu(
        &self,
        data_id: DataId,
        options: &GpuReadOptions,
    ) -> Result<GpuData, TensorError> {
        let _ = options;
        Err(TensorError::Unsupported {
            op: "read_to_gpu",
            detail: format!("no device memory backs data {data_id}"),
        })
    }
}

/// Tensor operations that live outside the handle type.
pub trait OpHandler: Send + Sync {
    /// Converts `x` to `dtype`. A same-dtype cast yields a new handle on
    /// the same data.
    fn cast(&self, x: &Tensor, dtype: DType) -> Result<Tensor, TensorError>;

    /// Builds a buffer of `shape`/`dtype`, optionally pre-filled.
    fn buffer(
        &self,
        shape: Shape,
        dtype: DType,
        values: Option<crate::TensorData>,
    ) -> Result<TensorBuffer, TensorError>;

    /// Writes the rendering of `x` to the handler's output.
    fn print(&self, x: &Tensor, verbose: bool) -> Result<(), TensorError>;

    /// A new handle, with its own identity, on `x`'s data.
    fn clone_tensor(&self, x: &Tensor) -> Result<Tensor, TensorError>;
}

/// The tracker and op handler every tensor handle is bound to.
#[derive(Clone)]
pub struct Context {
    tracker: Arc<dyn TensorTracker>,
    ops: Arc<dyn OpHandler>,
}

impl Context {
    pub fn new(tracker: Arc<dyn TensorTracker>, ops: Arc<dyn OpHandler>) -> Self {
        Self { tracker, ops }
    }

    pub fn tracker(&self) -> &dyn TensorTracker {
        self.tracker.as_ref()
    }

    pub fn ops(&self) -> &dyn OpHandler {
        self.ops.as_ref()
    }

    pub fn flags(&self) -> Flags {
        self.tracker.flags()
    }

    /// Whether two contexts share the same tracker.
    pub fn same_tracker(&self, other: &Context) -> bool {
        Arc::as_ptr(&self.tracker).cast::<()>() == Arc::as_ptr(&other.tracker).cast::<()>()
    }

    /// Uploads `values` and returns a tracked tensor of `shape`.
    ///
    /// The dtype is that of `values`.
    pub fn make_tensor(&self, values: DataValues, shape: impl Into<Shape>) -> Result<Tensor, TensorError> {
        let shape = shape.into();
        let size = shape.num_elements();
        if values.len() != size {
            return Err(TensorError::ValueCountMismatch {
                expected: size,
                actual: values.len(),
            });
        }
        let dtype = values.dtype();
        let data_id = self.tracker.write(values, &shape)?;
        let tensor = Tensor::new(self.clone(), shape, dtype, data_id, None);
        self.tracker.track(&tensor);
        Ok(tensor)
    }

    /// Creates a new handle on existing data, taking a reference on it.
    pub fn make_tensor_from_data_id(
        &self,
        data_id: DataId,
        shape: impl Into<Shape>,
        dtype: DType,
    ) -> Result<Tensor, TensorError> {
        let tensor = Tensor::new(self.clone(), shape.into(), dtype, data_id, None);
        self.tracker.inc_ref(&tensor)?;
        Ok(tensor)
    }

    /// Wraps `initial`'s data in a registered [`Variable`].
    ///
    /// With a `dtype` different from `initial`'s, the value is cast first.
    /// Unnamed variables get a tracker-assigned name.
    pub fn make_variable(
        &self,
        initial: &Tensor,
        trainable: bool,
        name: Option<&str>,
        dtype: Option<DType>,
    ) -> Result<Variable, TensorError> {
        let cast = match dtype {
            Some(dtype) if dtype != initial.dtype() => Some(initial.cast(dtype)?),
            _ => None,
        };
        let source = cast.as_ref().unwrap_or(initial);
        let name = match name {
            Some(name) => name.to_string(),
            None => self.tracker.next_variable_name(),
        };

        let tensor = Tensor::new(
            self.clone(),
            source.shape().clone(),
            source.dtype(),
            source.data_id(),
            Some((name, trainable)),
        );
        let variable = Variable::from_tensor(tensor);
        let registered = self.tracker.inc_ref(&variable).and_then(|()| {
            self.tracker.register_variable(&variable).map_err(|e| {
                self.tracker.dispose_tensor(&variable);
                e
            })
        });
        if let Some(cast) = cast {
            cast.dispose();
        }
        registered.map(|()| variable)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_id_bits_roundtrip() {
        let id = DataId::new(7, 3);
        assert_eq!(DataId::from_bits(id.to_bits()), id);
        let id = DataId::new(u32::MAX, u32::MAX - 1);
        assert_eq!(DataId::from_bits(id.to_bits()), id);
        assert_eq!(DataId::new(4, 2).to_string(), "4v2");
    }

    #[test]
    fn test_default_flags() {
        let f = Flags::default();
        assert!(!f.debug);
        assert!(f.check_shape_consistency);
    }
}
