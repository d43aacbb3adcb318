// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # data-storage
//!
//! A budget-enforced, reference-counted arena for backend-resident tensor
//! data.
//!
//! # Key Components
//!
//! - [`DataStorage`]: the arena. Values are written once, then shared by
//!   reference count and freed when the last reference is dropped.
//! - [`Handle`]: a slot index plus generation, so stale handles are
//!   detected instead of aliasing reused slots.
//! - [`PendingRead`]: an RAII guard that keeps an entry alive while a read
//!   is in flight, even past its last reference.
//! - [`MemoryBudget`]: an optional hard ceiling with human-readable parsing
//!   (`"512M"`, `"1G"`, ...).
//! - [`StorageStats`]: cumulative counters (writes, releases, peak bytes,
//!   OOM count).
//!
//! # Ownership Model
//!
//! ```text
//! DataStorage::write(value) ──▶ Handle (refs = 1)
//!       │
//!       ├── inc_ref / dec_ref ──▶ refs = 0 ──▶ entry freed
//!       │
//!       └── begin_read ──▶ PendingRead ◄── holds Arc<StorageInner>
//!                              │ drop()
//!                              ▼
//!                   StorageInner::end_read() ──▶ deferred free, if any
//! ```

mod budget;
mod error;
mod guard;
pub mod storage;
mod stats;

pub use budget::MemoryBudget;
pub use error::StorageError;
pub use guard::PendingRead;
pub use storage::{DataStorage, Handle, Payload, Release};
pub use stats::StorageStats;
