// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-cli
//!
//! Command-line front end for the tensor memory model.
//!
//! ## Usage
//! ```bash
//! # Render a tensor from JSON
//! tensor-cli print --values '[[1, 2], [3, 4]]' --dtype int32 --verbose
//!
//! # Flat offset <-> coordinates
//! tensor-cli locate --shape 3,2,2 --index 5
//! tensor-cli locate --shape 3,2,2 --loc 1,0,1
//!
//! # Memory accounting of a short session
//! tensor-cli memory --budget 1K
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tensor-cli",
    about = "Render, index and account strided tensors",
    version,
    author
)]
struct Cli {
    /// Path to an engine TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a tensor from a JSON literal and print it.
    Print {
        /// Nested JSON array or primitive, e.g. "[[1, 2], [3, 4]]".
        #[arg(long)]
        values: String,

        /// Comma-separated shape (e.g., "2,2").
        #[arg(short, long, value_delimiter = ',')]
        shape: Option<Vec<usize>>,

        /// float32, int32, bool, string (inferred when omitted).
        #[arg(short, long)]
        dtype: Option<String>,

        /// Include dtype, rank and shape in the rendering.
        #[arg(long)]
        long: bool,

        /// Emit the values as nested JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Convert between a flat offset and coordinates within a shape.
    Locate {
        /// Comma-separated shape (e.g., "3,2,2").
        #[arg(short, long, value_delimiter = ',', required = true)]
        shape: Vec<usize>,

        /// Flat offset to convert to coordinates.
        #[arg(short, long, conflicts_with = "loc")]
        index: Option<usize>,

        /// Comma-separated coordinates to convert to a flat offset.
        #[arg(short, long, value_delimiter = ',', required_unless_present = "index")]
        loc: Option<Vec<usize>>,
    },

    /// Run a short session and report the engine's memory accounting.
    Memory {
        /// Storage budget for the session (e.g., "1K", "512M").
        #[arg(short, long)]
        budget: Option<String>,

        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Print {
            values,
            shape,
            dtype,
            long,
            json,
        } => commands::print::execute(cli.config, values, shape, dtype, long, json).await,
        Commands::Locate { shape, index, loc } => commands::locate::execute(shape, index, loc),
        Commands::Memory { budget, json } => {
            commands::memory::execute(cli.config, budget, json).await
        }
    }
}
