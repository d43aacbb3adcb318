// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Disposable tensor handles and in-place-assignable variables.
//!
//! A [`Tensor`] describes data it does not own: shape, dtype and strides are
//! fixed at construction, while the values live behind a [`DataId`] in the
//! tracker of the handle's [`Context`]. Cloning a `Tensor` copies the
//! handle, not the identity; both copies observe the same disposed flag.
//! Use [`Tensor::clone_tensor`] for a new identity.
//!
//! ```text
//!   Live ──dispose()──▶ Disposed      (dispose() is a no-op once Disposed)
//! ```

use crate::format::tensor_to_string;
use crate::nested::{self, NestedArray};
use crate::shape::compute_strides;
use crate::tracker::{GpuData, GpuReadOptions};
use crate::{Context, DType, DataId, Shape, TensorBuffer, TensorBytes, TensorData, TensorError};
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_TENSOR_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique tensor identity, distinct from the (shareable) [`DataId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(u64);

impl TensorId {
    fn next() -> Self {
        Self(NEXT_TENSOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rank classification; everything past rank 4 is `Higher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankType {
    R0,
    R1,
    R2,
    R3,
    R4,
    Higher,
}

impl RankType {
    pub fn from_rank(rank: usize) -> Self {
        match rank {
            0 => RankType::R0,
            1 => RankType::R1,
            2 => RankType::R2,
            3 => RankType::R3,
            4 => RankType::R4,
            _ => RankType::Higher,
        }
    }
}

struct VariableState {
    name: String,
    trainable: AtomicBool,
}

struct TensorInner {
    id: TensorId,
    shape: Shape,
    dtype: DType,
    strides: Vec<usize>,
    size: usize,
    data_id: AtomicU64,
    disposed: AtomicBool,
    variable: Option<VariableState>,
    ctx: Context,
}

/// A handle on tracker-owned tensor data.
#[derive(Clone)]
pub struct Tensor {
    inner: Arc<TensorInner>,
}

impl Tensor {
    /// Builds a handle. Registration with the tracker is the caller's job;
    /// see [`Context::make_tensor`] and [`Context::make_tensor_from_data_id`].
    pub(crate) fn new(
        ctx: Context,
        shape: Shape,
        dtype: DType,
        data_id: DataId,
        variable: Option<(String, bool)>,
    ) -> Self {
        Self {
            inner: Arc::new(TensorInner {
                id: TensorId::next(),
                strides: compute_strides(shape.dims()),
                size: shape.num_elements(),
                shape,
                dtype,
                data_id: AtomicU64::new(data_id.to_bits()),
                disposed: AtomicBool::new(false),
                variable: variable.map(|(name, trainable)| VariableState {
                    name,
                    trainable: AtomicBool::new(trainable),
                }),
                ctx,
            }),
        }
    }

    pub fn id(&self) -> TensorId {
        self.inner.id
    }

    /// The data this handle currently points at.
    pub fn data_id(&self) -> DataId {
        DataId::from_bits(self.inner.data_id.load(Ordering::Acquire))
    }

    pub fn shape(&self) -> &Shape {
        &self.inner.shape
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    pub fn rank(&self) -> usize {
        self.inner.shape.rank()
    }

    pub fn rank_type(&self) -> RankType {
        RankType::from_rank(self.rank())
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub fn strides(&self) -> &[usize] {
        &self.inner.strides
    }

    pub fn context(&self) -> &Context {
        &self.inner.ctx
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Whether this handle backs a [`Variable`].
    pub fn is_variable(&self) -> bool {
        self.inner.variable.is_some()
    }

    fn throw_if_disposed(&self) -> Result<(), TensorError> {
        if self.is_disposed() {
            return Err(TensorError::Disposed);
        }
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────

    /// Downloads the values.
    ///
    /// The read is registered when this is called, so the returned future
    /// still resolves if the tensor is disposed before it is awaited.
    pub fn data(&self) -> impl Future<Output = Result<TensorData, TensorError>> + Send + 'static {
        let pending = self
            .throw_if_disposed()
            .map(|()| self.context().tracker().read(self.data_id()));
        async move { pending?.await?.decode() }
    }

    /// Reads the values immediately.
    pub fn data_sync(&self) -> Result<TensorData, TensorError> {
        self.throw_if_disposed()?;
        self.context().tracker().read_sync(self.data_id())?.decode()
    }

    /// Raw bytes: one entry per string element, otherwise the little-endian
    /// byte view of the numeric array. Strings are not decoded.
    pub fn bytes(&self) -> impl Future<Output = Result<TensorBytes, TensorError>> + Send + 'static {
        let pending = self
            .throw_if_disposed()
            .map(|()| self.context().tracker().read(self.data_id()));
        async move { Ok(pending?.await?.to_bytes()) }
    }

    /// Downloads the values into a new, independent [`TensorBuffer`].
    pub fn buffer(&self) -> impl Future<Output = Result<TensorBuffer, TensorError>> + Send + 'static {
        let data = self.data();
        let ctx = self.context().clone();
        let (shape, dtype) = (self.shape().clone(), self.dtype());
        async move { ctx.ops().buffer(shape, dtype, Some(data.await?)) }
    }

    pub fn buffer_sync(&self) -> Result<TensorBuffer, TensorError> {
        let data = self.data_sync()?;
        self.context()
            .ops()
            .buffer(self.shape().clone(), self.dtype(), Some(data))
    }

    /// Downloads the values re-nested by shape.
    pub fn array(&self) -> impl Future<Output = Result<NestedArray, TensorError>> + Send + 'static {
        let data = self.data();
        let shape = self.shape().clone();
        async move { nested::to_nested_array(shape.dims(), &data.await?) }
    }

    pub fn array_sync(&self) -> Result<NestedArray, TensorError> {
        nested::to_nested_array(self.shape().dims(), &self.data_sync()?)
    }

    /// Exposes the data as a device resource. Backends without device
    /// memory return [`TensorError::Unsupported`].
    pub fn data_to_gpu(&self, options: &GpuReadOptions) -> Result<GpuData, TensorError> {
        self.throw_if_disposed()?;
        self.context().tracker().read_to_gpu(self.data_id(), options)
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Releases this handle's reference. Further calls are no-ops.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let tracker = self.context().tracker();
        if self.is_variable() {
            tracker.dispose_variable(&Variable::from_tensor(self.clone()));
        } else {
            tracker.dispose_tensor(self);
        }
    }

    // ── Delegated ops ──────────────────────────────────────────

    /// A new tensor identity on the same data.
    pub fn clone_tensor(&self) -> Result<Tensor, TensorError> {
        self.throw_if_disposed()?;
        self.context().ops().clone_tensor(self)
    }

    pub fn cast(&self, dtype: DType) -> Result<Tensor, TensorError> {
        self.throw_if_disposed()?;
        self.context().ops().cast(self, dtype)
    }

    pub fn print(&self, verbose: bool) -> Result<(), TensorError> {
        self.throw_if_disposed()?;
        self.context().ops().print(self, verbose)
    }

    /// Renders the tensor as text. See [`crate::format`] for the layout.
    pub fn to_string(&self, verbose: bool) -> Result<String, TensorError> {
        let data = self.data_sync()?;
        Ok(tensor_to_string(&data, self.shape().dims(), verbose))
    }

    /// A new handle of a different shape on the same data.
    pub fn reshape(&self, shape: impl Into<Shape>) -> Result<Tensor, TensorError> {
        self.throw_if_disposed()?;
        let shape = shape.into();
        if shape.num_elements() != self.size() {
            return Err(TensorError::ReshapeSize {
                size: self.size(),
                shape,
            });
        }
        self.context()
            .make_tensor_from_data_id(self.data_id(), shape, self.dtype())
    }

    /// Wraps this tensor's current data in a new [`Variable`].
    pub fn variable(
        &self,
        trainable: bool,
        name: Option<&str>,
        dtype: Option<DType>,
    ) -> Result<Variable, TensorError> {
        self.throw_if_disposed()?;
        self.context().make_variable(self, trainable, name, dtype)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id())
            .field("shape", self.shape())
            .field("dtype", &self.dtype())
            .field("data_id", &self.data_id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A tensor whose data can be replaced in place while keeping its
/// identity, shape and dtype.
#[derive(Clone)]
pub struct Variable {
    tensor: Tensor,
}

impl Variable {
    pub(crate) fn from_tensor(tensor: Tensor) -> Self {
        debug_assert!(tensor.is_variable());
        Self { tensor }
    }

    fn state(&self) -> Option<&VariableState> {
        self.tensor.inner.variable.as_ref()
    }

    pub fn name(&self) -> &str {
        self.state().map(|s| s.name.as_str()).unwrap_or_default()
    }

    pub fn trainable(&self) -> bool {
        self.state()
            .is_some_and(|s| s.trainable.load(Ordering::Relaxed))
    }

    pub fn set_trainable(&self, trainable: bool) {
        if let Some(state) = self.state() {
            state.trainable.store(trainable, Ordering::Relaxed);
        }
    }

    /// The underlying handle.
    pub fn as_tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Points this variable at `new_value`'s data.
    ///
    /// Dtype, shape and tracker must match; otherwise the variable is left
    /// untouched. The new data reference is taken before the old one is
    /// dropped.
    pub fn assign(&self, new_value: &Tensor) -> Result<(), TensorError> {
        self.tensor.throw_if_disposed()?;
        new_value.throw_if_disposed()?;
        if new_value.dtype() != self.dtype() {
            return Err(TensorError::VariableDType {
                current: self.dtype(),
                new: new_value.dtype(),
            });
        }
        if new_value.shape() != self.shape() {
            return Err(TensorError::VariableShape {
                current: self.shape().clone(),
                new: new_value.shape().clone(),
            });
        }
        if !self.context().same_tracker(new_value.context()) {
            return Err(TensorError::InvalidArgument(format!(
                "cannot assign tensor {} to variable '{}' (tensor {}): they belong to different trackers",
                new_value.id(),
                self.name(),
                self.id()
            )));
        }
        let old = self.data_id();
        if new_value.data_id() == old {
            return Ok(());
        }

        let tracker = self.context().tracker();
        let inner = &self.tensor.inner;
        inner.data_id.store(new_value.data_id().to_bits(), Ordering::Release);
        if let Err(e) = tracker.inc_ref(&self.tensor) {
            inner.data_id.store(old.to_bits(), Ordering::Release);
            return Err(e);
        }
        // Release the previous data through a detached handle so the
        // variable never points at it again.
        let previous = Tensor::new(
            self.context().clone(),
            self.shape().clone(),
            self.dtype(),
            old,
            None,
        );
        tracker.dispose_tensor(&previous);
        Ok(())
    }

    /// Unregisters and releases the variable. Further calls are no-ops.
    pub fn dispose(&self) {
        self.tensor.dispose();
    }
}

impl Deref for Variable {
    type Target = Tensor;

    fn deref(&self) -> &Tensor {
        &self.tensor
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name())
            .field("trainable", &self.trainable())
            .field("tensor", &self.tensor)
            .finish()
    }
}
