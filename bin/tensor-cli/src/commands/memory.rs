// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tensor-cli memory` command: walk through a short session and report
//! the engine's accounting after each step.
//!
//! The session exercises creation, reshape, a disposal scope, a variable
//! and a read that outlives its tensor, so every counter moves at least
//! once.

use engine::{Engine, MemoryInfo};
use std::path::PathBuf;
use tensor_core::DType;

pub async fn execute(config: Option<PathBuf>, budget: Option<String>, json: bool) -> anyhow::Result<()> {
    let mut config = super::load_config(config.as_deref())?;
    if budget.is_some() {
        config.memory_budget = budget;
    }
    let engine = super::build_engine(config)?;
    let mut steps: Vec<(&'static str, MemoryInfo)> = Vec::new();

    let ctx = engine.context();
    let x = ctx.tensor2d(vec![vec![1.0, 2.0], vec![3.0, 4.0]], None, None)?;
    let labels = ctx.tensor1d(vec!["cat", "dog"], None)?;
    steps.push(("create float32 + string", engine.memory()));

    let flat = x.reshape([4])?;
    steps.push(("reshape (shared data)", engine.memory()));

    let total = engine.tidy(|ctx| -> anyhow::Result<_> {
        let ints = flat.cast(DType::Int32)?;
        let scratch = ctx.tensor1d(vec![0, 0, 0, 0], Some(DType::Int32))?;
        scratch.dispose();
        Ok(ints)
    })?;
    steps.push(("tidy (cast kept, scratch gone)", engine.memory()));

    let weights = x.variable(true, Some("weights"), None)?;
    steps.push(("variable over x", engine.memory()));

    let pending = labels.data();
    labels.dispose();
    steps.push(("dispose during read", engine.memory()));
    pending.await?;
    steps.push(("read settled", engine.memory()));

    for t in [&x, &flat, &total] {
        t.dispose();
    }
    weights.dispose();
    steps.push(("dispose everything", engine.memory()));

    if json {
        let report: Vec<serde_json::Value> = steps
            .iter()
            .map(|(step, info)| serde_json::json!({ "step": step, "memory": info }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render(&engine, &steps);
    }
    Ok(())
}

fn render(engine: &Engine, steps: &[(&str, MemoryInfo)]) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            tensor-cli · Memory Accounting            ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
    println!(
        "  Budget: {}",
        engine.config().memory_budget.as_deref().unwrap_or("unbounded")
    );
    println!();
    println!(
        "  {:<32} {:>8} {:>8} {:>8} {:>8}",
        "Step", "Tensors", "Strings", "Buffers", "Bytes",
    );
    println!("  {}", "-".repeat(68));
    for (step, info) in steps {
        println!(
            "  {:<32} {:>8} {:>8} {:>8} {:>8}",
            step, info.num_tensors, info.num_string_tensors, info.num_data_buffers, info.num_bytes,
        );
    }
    println!();
    if let Some((_, last)) = steps.last() {
        println!("  Storage: {}", last.storage.summary());
    }
}
