// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tensor-cli print` command: build a tensor from JSON and render it.

use std::path::PathBuf;
use tensor_core::{DType, NestedArray};

pub async fn execute(
    config: Option<PathBuf>,
    values: String,
    shape: Option<Vec<usize>>,
    dtype: Option<String>,
    long: bool,
    json: bool,
) -> anyhow::Result<()> {
    let engine = super::build_engine(super::load_config(config.as_deref())?)?;
    let ctx = engine.context();

    let values = NestedArray::from_json(&values)
        .map_err(|e| anyhow::anyhow!("invalid --values: {e}"))?;
    let dtype = dtype
        .as_deref()
        .map(str::parse::<DType>)
        .transpose()?;

    let tensor = ctx.tensor(values, shape.as_deref(), dtype)?;
    tracing::debug!(id = %tensor.id(), shape = %tensor.shape(), dtype = %tensor.dtype(), "tensor built");

    if json {
        let array = tensor.array().await?;
        println!("{}", serde_json::to_string_pretty(&array.to_json())?);
    } else {
        tensor.print(long)?;
    }

    tensor.dispose();
    tracing::info!("{}", engine.memory().summary());
    Ok(())
}
