// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The reference tensor tracker.
//!
//! An [`Engine`] owns a [`DataStorage`] of tensor values and implements both
//! [`TensorTracker`] and [`OpHandler`] on top of it. Every tensor made
//! through [`Engine::context`] is bound to this engine.
//!
//! ```text
//!  Context::make_tensor ──▶ write ──▶ DataStorage (refs = 1)
//!                       └─▶ track ──▶ num_tensors += 1, innermost scope
//!  Tensor::dispose ─────▶ dispose_tensor ──▶ num_tensors -= 1, dec_ref
//!  Tensor::data ────────▶ read ──▶ PendingRead (defers release) ──▶ values
//! ```
//!
//! # Scopes
//! [`Engine::tidy`] runs a closure inside a fresh scope and disposes every
//! tensor the closure created, except its result and tensors passed to
//! [`Engine::keep`]. The scope stack belongs to the engine, not to a
//! thread; drive nested `tidy` calls from one task at a time.

use crate::scope::{Scope, TensorContainer};
use crate::{EngineConfig, EngineError, MemoryInfo};
use data_storage::{DataStorage, Handle, Payload, Release};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tensor_core::{
    cast, Context, DType, DataId, DataValues, Flags, OpHandler, ReadFuture, Shape, Tensor,
    TensorBuffer, TensorData, TensorError, TensorId, TensorTracker, Variable,
};
use tracing::{debug, info, warn};

/// Backend representation of one tensor's values.
#[derive(Debug, Clone)]
struct StoredValues(DataValues);

impl Payload for StoredValues {
    fn size_bytes(&self) -> usize {
        self.0.size_bytes()
    }
}

fn handle_of(data_id: DataId) -> Handle {
    Handle::new(data_id.index(), data_id.generation())
}

fn data_id_of(handle: Handle) -> DataId {
    DataId::new(handle.index(), handle.generation())
}

fn backend_error(op: &'static str) -> impl Fn(data_storage::StorageError) -> TensorError {
    move |e| TensorError::Backend {
        op,
        detail: e.to_string(),
    }
}

#[derive(Debug, Default)]
struct EngineState {
    num_tensors: usize,
    num_string_tensors: usize,
    scopes: Vec<Scope>,
    kept: HashSet<TensorId>,
    variables: HashMap<String, Variable>,
}

struct EngineInner {
    config: EngineConfig,
    storage: DataStorage<StoredValues>,
    state: Mutex<EngineState>,
    next_variable_id: AtomicU64,
    next_scope_id: AtomicU64,
}

impl EngineInner {
    /// Recovers the state from a poisoned lock; counters stay usable.
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TensorTracker for EngineInner {
    fn flags(&self) -> Flags {
        self.config.flags()
    }

    fn write(&self, values: DataValues, shape: &Shape) -> Result<DataId, TensorError> {
        let dtype = values.dtype();
        let handle = self
            .storage
            .write(StoredValues(values))
            .map_err(backend_error("write"))?;
        debug!(%handle, %shape, %dtype, "tensor data written");
        Ok(data_id_of(handle))
    }

    fn track(&self, tensor: &Tensor) {
        let mut state = self.state();
        state.num_tensors += 1;
        if tensor.dtype() == DType::String {
            state.num_string_tensors += 1;
        }
        if tensor.is_variable() {
            return;
        }
        if let Some(scope) = state.scopes.last_mut() {
            scope.tracked.push(tensor.clone());
        }
    }

    fn inc_ref(&self, tensor: &Tensor) -> Result<(), TensorError> {
        self.storage
            .inc_ref(handle_of(tensor.data_id()))
            .map_err(backend_error("inc_ref"))?;
        self.track(tensor);
        Ok(())
    }

    fn dispose_tensor(&self, tensor: &Tensor) {
        {
            let mut state = self.state();
            state.num_tensors = state.num_tensors.saturating_sub(1);
            if tensor.dtype() == DType::String {
                state.num_string_tensors = state.num_string_tensors.saturating_sub(1);
            }
            state.kept.remove(&tensor.id());
        }
        let handle = handle_of(tensor.data_id());
        match self.storage.dec_ref(handle) {
            Ok(Release::Retained) => {}
            Ok(Release::Released) => debug!(%handle, tensor = %tensor.id(), "tensor data released"),
            Ok(Release::Deferred) => {
                debug!(%handle, tensor = %tensor.id(), "tensor data release deferred until reads settle")
            }
            Err(e) => warn!(%handle, tensor = %tensor.id(), "dispose of untracked data: {e}"),
        }
    }

    fn register_variable(&self, variable: &Variable) -> Result<(), TensorError> {
        let mut state = self.state();
        if state.variables.contains_key(variable.name()) {
            return Err(TensorError::VariableExists(variable.name().to_string()));
        }
        state
            .variables
            .insert(variable.name().to_string(), variable.clone());
        debug!(name = variable.name(), "variable registered");
        Ok(())
    }

    fn dispose_variable(&self, variable: &Variable) {
        let removed = {
            let mut state = self.state();
            let registered = state
                .variables
                .get(variable.name())
                .is_some_and(|v| v.id() == variable.id());
            if registered {
                state.variables.remove(variable.name())
            } else {
                None
            }
        };
        if removed.is_none() {
            warn!(
                "{}",
                TensorError::VariableUnknown(variable.name().to_string())
            );
        }
        self.dispose_tensor(variable);
    }

    fn next_variable_name(&self) -> String {
        self.next_variable_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    fn read(&self, data_id: DataId) -> ReadFuture {
        let pending = self
            .storage
            .begin_read(handle_of(data_id))
            .map_err(backend_error("read"));
        Box::pin(async move {
            let pending = pending?;
            tokio::task::yield_now().await;
            Ok(pending.into_value().0)
        })
    }

    fn read_sync(&self, data_id: DataId) -> Result<DataValues, TensorError> {
        let StoredValues(values) = self
            .storage
            .read(handle_of(data_id))
            .map_err(backend_error("read_sync"))?;
        if values.len() > self.config.sync_read_warn_elements {
            warn!(
                elements = values.len(),
                threshold = self.config.sync_read_warn_elements,
                "synchronous read of a large tensor blocks the caller; prefer data()"
            );
        }
        Ok(values)
    }
}

impl OpHandler for EngineInner {
    fn cast(&self, x: &Tensor, dtype: DType) -> Result<Tensor, TensorError> {
        if x.dtype() == dtype {
            return self.clone_tensor(x);
        }
        let values = cast::cast_values(self.read_sync(x.data_id())?, dtype)?;
        x.context().make_tensor(values, x.shape().clone())
    }

    fn buffer(
        &self,
        shape: Shape,
        dtype: DType,
        values: Option<TensorData>,
    ) -> Result<TensorBuffer, TensorError> {
        TensorBuffer::new(shape, dtype, values)
    }

    fn print(&self, x: &Tensor, verbose: bool) -> Result<(), TensorError> {
        println!("{}", x.to_string(verbose)?);
        Ok(())
    }

    fn clone_tensor(&self, x: &Tensor) -> Result<Tensor, TensorError> {
        x.context()
            .make_tensor_from_data_id(x.data_id(), x.shape().clone(), x.dtype())
    }
}

/// A tensor tracker with reference-counted storage, disposal scopes and a
/// variable registry.
///
/// # Example
/// ```
/// use engine::Engine;
///
/// let engine = Engine::default();
/// let ctx = engine.context();
/// let t = ctx.tensor(vec![1.0, 2.0, 3.0], None, None).unwrap();
/// assert_eq!(engine.memory().num_tensors, 1);
/// t.dispose();
/// assert_eq!(engine.memory().num_tensors, 0);
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
    ctx: Context,
}

impl Engine {
    /// Creates an engine, validating the configured budget.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let budget = config.parse_budget()?;
        let engine = Self::with_storage(config, DataStorage::new(budget));
        info!(
            budget = %budget.map_or_else(|| "unbounded".to_string(), |b| b.to_string()),
            debug = engine.inner.config.debug,
            "engine created"
        );
        Ok(engine)
    }

    fn with_storage(config: EngineConfig, storage: DataStorage<StoredValues>) -> Self {
        let inner = Arc::new(EngineInner {
            config,
            storage,
            state: Mutex::new(EngineState::default()),
            next_variable_id: AtomicU64::new(0),
            next_scope_id: AtomicU64::new(0),
        });
        let ctx = Context::new(inner.clone(), inner.clone());
        Self { inner, ctx }
    }

    /// The context tensors of this engine are created through.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Current accounting.
    pub fn memory(&self) -> MemoryInfo {
        let (num_tensors, num_string_tensors) = {
            let state = self.inner.state();
            (state.num_tensors, state.num_string_tensors)
        };
        let storage = &self.inner.storage;
        MemoryInfo {
            num_tensors,
            num_data_buffers: storage.len(),
            num_bytes: storage.allocated_bytes(),
            num_string_tensors,
            storage: storage.stats(),
        }
    }

    // ── Scopes ─────────────────────────────────────────────────

    /// Runs `f` in a fresh scope, disposing every tensor it creates except
    /// those in its result and those marked with [`keep`](Self::keep).
    pub fn tidy<R, F>(&self, f: F) -> R
    where
        R: TensorContainer,
        F: FnOnce(&Context) -> R,
    {
        self.start_scope(None);
        let result = f(&self.ctx);
        self.end_scope(&result);
        result
    }

    /// Pushes a scope. Prefer [`tidy`](Self::tidy).
    pub fn start_scope(&self, name: Option<&str>) {
        let id = self.inner.next_scope_id.fetch_add(1, Ordering::Relaxed);
        let name = name.map_or_else(|| format!("scope-{id}"), str::to_string);
        self.inner.state().scopes.push(Scope::new(name));
    }

    /// Pops the innermost scope, disposing what it tracked except `result`.
    pub fn end_scope<R: TensorContainer + ?Sized>(&self, result: &R) {
        let result_ids: HashSet<TensorId> = result.tensors().iter().map(Tensor::id).collect();
        let Some(scope) = self.inner.state().scopes.pop() else {
            warn!("end_scope called with no active scope");
            return;
        };
        let name = scope.name.clone();
        let (dispose, promote) = {
            let state = self.inner.state();
            scope.settle(&result_ids, &state.kept)
        };

        for tensor in &dispose {
            tensor.dispose();
        }

        let mut state = self.inner.state();
        if let Some(parent) = state.scopes.last_mut() {
            parent.tracked.extend(promote);
        }
        debug!(scope = %name, disposed = dispose.len(), "scope ended");
    }

    /// Exempts `tensor` from disposal by any enclosing scope.
    pub fn keep(&self, tensor: &Tensor) -> Tensor {
        self.inner.state().kept.insert(tensor.id());
        tensor.clone()
    }

    /// Number of active scopes.
    pub fn scope_depth(&self) -> usize {
        self.inner.state().scopes.len()
    }

    // ── Variables ──────────────────────────────────────────────

    /// The registered variable called `name`.
    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.inner.state().variables.get(name).cloned()
    }

    /// Names of all registered variables, sorted.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state().variables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Disposes every registered variable.
    pub fn dispose_variables(&self) {
        let variables: Vec<Variable> = self.inner.state().variables.values().cloned().collect();
        for variable in variables {
            variable.dispose();
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_storage(EngineConfig::default(), DataStorage::unbounded())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("storage", &self.inner.storage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_id_handle_conversion() {
        let id = DataId::new(3, 9);
        assert_eq!(data_id_of(handle_of(id)), id);
    }

    #[test]
    fn test_new_rejects_bad_budget() {
        let config = EngineConfig {
            memory_budget: Some("0M".into()),
            ..Default::default()
        };
        assert!(matches!(Engine::new(config), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_variable_names_are_sequential() {
        let engine = Engine::default();
        assert_eq!(engine.inner.next_variable_name(), "0");
        assert_eq!(engine.inner.next_variable_name(), "1");
    }

    #[test]
    fn test_end_scope_without_scope_is_noop() {
        let engine = Engine::default();
        engine.end_scope(&());
        assert_eq!(engine.scope_depth(), 0);
    }
}
