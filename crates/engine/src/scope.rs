// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Automatic disposal scopes.
//!
//! A scope records every tensor created while it is the innermost one.
//! Ending it disposes them, except tensors that are part of the scope's
//! result (those move to the parent scope) and tensors marked as kept.

use std::collections::HashSet;
use tensor_core::{Tensor, TensorId, Variable};

/// Values that may contain tensors, so a scope knows what to spare.
pub trait TensorContainer {
    /// Appends every tensor handle reachable from `self` to `out`.
    fn collect_tensors(&self, out: &mut Vec<Tensor>);

    fn tensors(&self) -> Vec<Tensor> {
        let mut out = Vec::new();
        self.collect_tensors(&mut out);
        out
    }
}

impl TensorContainer for () {
    fn collect_tensors(&self, _out: &mut Vec<Tensor>) {}
}

impl TensorContainer for Tensor {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        out.push(self.clone());
    }
}

impl TensorContainer for Variable {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        out.push(self.as_tensor().clone());
    }
}

impl<T: TensorContainer> TensorContainer for Option<T> {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        if let Some(inner) = self {
            inner.collect_tensors(out);
        }
    }
}

impl<T: TensorContainer, E> TensorContainer for Result<T, E> {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        if let Ok(inner) = self {
            inner.collect_tensors(out);
        }
    }
}

impl<T: TensorContainer> TensorContainer for Vec<T> {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        for item in self {
            item.collect_tensors(out);
        }
    }
}

impl<A: TensorContainer, B: TensorContainer> TensorContainer for (A, B) {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        self.0.collect_tensors(out);
        self.1.collect_tensors(out);
    }
}

impl<A: TensorContainer, B: TensorContainer, C: TensorContainer> TensorContainer for (A, B, C) {
    fn collect_tensors(&self, out: &mut Vec<Tensor>) {
        self.0.collect_tensors(out);
        self.1.collect_tensors(out);
        self.2.collect_tensors(out);
    }
}

/// One level of the scope stack.
#[derive(Debug)]
pub(crate) struct Scope {
    pub(crate) name: String,
    pub(crate) tracked: Vec<Tensor>,
}

impl Scope {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracked: Vec::new(),
        }
    }

    /// Splits the tracked tensors into those to dispose and those that
    /// survive into the parent scope.
    pub(crate) fn settle(
        self,
        result: &HashSet<TensorId>,
        kept: &HashSet<TensorId>,
    ) -> (Vec<Tensor>, Vec<Tensor>) {
        let mut dispose = Vec::new();
        let mut promote = Vec::new();
        for tensor in self.tracked {
            if kept.contains(&tensor.id()) {
                continue;
            }
            if result.contains(&tensor.id()) {
                promote.push(tensor);
            } else {
                dispose.push(tensor);
            }
        }
        (dispose, promote)
    }
}
