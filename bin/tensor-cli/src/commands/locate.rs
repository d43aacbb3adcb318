// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `tensor-cli locate` command: flat offset <-> coordinates.

use tensor_core::Shape;

pub fn execute(dims: Vec<usize>, index: Option<usize>, loc: Option<Vec<usize>>) -> anyhow::Result<()> {
    let shape = Shape::new(dims);
    let size = shape.num_elements();

    println!("  Shape:    {shape}");
    println!("  Size:     {size}");
    println!("  Strides:  {:?}", shape.strides());

    match (index, loc) {
        (Some(index), _) => {
            if index >= size {
                anyhow::bail!("index {index} is out of range for shape {shape} (size {size})");
            }
            println!("  Index {index} -> {:?}", shape.index_to_loc(index));
        }
        (None, Some(loc)) => {
            if loc.len() != shape.rank() {
                anyhow::bail!(
                    "the number of provided coordinates ({}) must match the rank ({})",
                    loc.len(),
                    shape.rank()
                );
            }
            if loc.iter().zip(shape.dims()).any(|(&l, &d)| l >= d) {
                anyhow::bail!("requested out of range element at {loc:?}; shape={shape}");
            }
            println!("  {loc:?} -> index {}", shape.loc_to_index(&loc));
        }
        (None, None) => anyhow::bail!("pass either --index or --loc"),
    }
    Ok(())
}
