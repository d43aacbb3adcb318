// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference-counted, generation-checked storage arena.
//!
//! [`DataStorage`] keeps one entry per written value. Entries live in a slot
//! vector; a [`Handle`] names a slot plus the generation it was issued
//! for, so a handle to a released entry can never alias a newer one that
//! reuses the slot.
//!
//! # Entry lifecycle
//!
//! ```text
//! write ──▶ refs=1 ──inc_ref/dec_ref──▶ refs=0 ─┬─ no pending reads ──▶ released
//!                                               └─ pending reads ─────▶ deferred
//!                                                   last PendingRead drop ──▶ released
//! ```
//!
//! # Thread Safety
//! `DataStorage` is `Send + Sync` and cheap to clone: clones share one arena.

use crate::{MemoryBudget, PendingRead, StorageError, StorageStats};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// A value that can be kept in a [`DataStorage`].
pub trait Payload: Send + Sync + 'static {
    /// Bytes charged against the budget for this value.
    fn size_bytes(&self) -> usize;
}

impl Payload for Vec<u8> {
    fn size_bytes(&self) -> usize {
        self.len()
    }
}

impl Payload for Vec<f32> {
    fn size_bytes(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }
}

/// Generation-checked key for a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Outcome of [`DataStorage::dec_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other references remain.
    Retained,
    /// The entry was freed.
    Released,
    /// No references remain, but reads are pending; the last one frees it.
    Deferred,
}

struct Entry<V> {
    value: Arc<V>,
    size_bytes: usize,
    refs: usize,
    pending_reads: usize,
    /// Set once `refs` hits zero while reads are pending.
    releasing: bool,
}

struct Slot<V> {
    generation: u32,
    entry: Option<Entry<V>>,
}

struct Slots<V> {
    slots: Vec<Slot<V>>,
    free: Vec<u32>,
    live: usize,
}

impl<V> Slots<V> {
    fn entry_mut(&mut self, handle: Handle) -> Result<&mut Entry<V>, StorageError> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(StorageError::StaleHandle(handle))
    }

    /// Like [`entry_mut`](Self::entry_mut), but entries awaiting a deferred
    /// release are treated as gone.
    fn live_entry_mut(&mut self, handle: Handle) -> Result<&mut Entry<V>, StorageError> {
        match self.entry_mut(handle)? {
            entry if entry.releasing => Err(StorageError::StaleHandle(handle)),
            entry => Ok(entry),
        }
    }

    /// Frees the slot and bumps its generation. Returns the freed size.
    fn remove(&mut self, handle: Handle) -> usize {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return 0;
        };
        let size = slot.entry.take().map_or(0, |e| e.size_bytes);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        size
    }
}

/// Arena state shared between a storage and its outstanding read guards.
pub(crate) struct StorageInner<V> {
    budget: Option<MemoryBudget>,
    allocated_bytes: AtomicUsize,
    slots: Mutex<Slots<V>>,
    stats: Mutex<StorageStats>,
}

impl<V> StorageInner<V> {
    fn lock_slots(&self) -> Result<MutexGuard<'_, Slots<V>>, StorageError> {
        self.slots
            .lock()
            .map_err(|_| StorageError::Corrupted("slot table lock poisoned".into()))
    }

    fn with_stats(&self, f: impl FnOnce(&mut StorageStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }

    fn free(&self, slots: &mut Slots<V>, handle: Handle, deferred: bool) {
        let size = slots.remove(handle);
        self.allocated_bytes.fetch_sub(size, Ordering::AcqRel);
        self.with_stats(|s| s.record_release(deferred));
        debug!(%handle, size, deferred, "released data");
    }

    /// Called by `PendingRead::drop`.
    pub(crate) fn end_read(&self, handle: Handle) {
        let Ok(mut slots) = self.lock_slots() else {
            return;
        };
        let Ok(entry) = slots.entry_mut(handle) else {
            return;
        };
        entry.pending_reads = entry.pending_reads.saturating_sub(1);
        if entry.releasing && entry.pending_reads == 0 {
            self.free(&mut slots, handle, true);
        }
    }
}

/// A budget-enforced arena of reference-counted values.
///
/// ```
/// use data_storage::{DataStorage, Release};
///
/// let storage = DataStorage::unbounded();
/// let h = storage.write(vec![1u8, 2, 3]).unwrap();
/// storage.inc_ref(h).unwrap();
/// assert_eq!(storage.dec_ref(h).unwrap(), Release::Retained);
/// assert_eq!(storage.dec_ref(h).unwrap(), Release::Released);
/// assert!(storage.read(h).is_err());
/// ```
pub struct DataStorage<V> {
    inner: Arc<StorageInner<V>>,
}

impl<V> Clone for DataStorage<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Payload> DataStorage<V> {
    /// Creates a storage, optionally capped by `budget`.
    pub fn new(budget: Option<MemoryBudget>) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                budget,
                allocated_bytes: AtomicUsize::new(0),
                slots: Mutex::new(Slots {
                    slots: Vec::new(),
                    free: Vec::new(),
                    live: 0,
                }),
                stats: Mutex::new(StorageStats::default()),
            }),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn with_budget(budget: MemoryBudget) -> Self {
        Self::new(Some(budget))
    }

    /// Stores `value` and returns its handle with a reference count of one.
    ///
    /// Returns `Err(OutOfMemory)` if the value does not fit in the budget.
    pub fn write(&self, value: V) -> Result<Handle, StorageError> {
        let size = value.size_bytes();
        let mut slots = self.inner.lock_slots()?;

        let current = self.allocated_bytes();
        if let Some(budget) = self.inner.budget {
            let budget = budget.as_bytes();
            if current.saturating_add(size) > budget {
                self.inner.with_stats(StorageStats::record_oom);
                warn!(requested = size, current, budget, "storage budget exceeded");
                return Err(StorageError::OutOfMemory {
                    requested_bytes: size,
                    available_bytes: budget.saturating_sub(current),
                    budget_bytes: budget,
                });
            }
        }

        let entry = Entry {
            value: Arc::new(value),
            size_bytes: size,
            refs: 1,
            pending_reads: 0,
            releasing: false,
        };
        let handle = match slots.free.pop() {
            Some(index) => {
                let slot = &mut slots.slots[index as usize];
                slot.entry = Some(entry);
                Handle::new(index, slot.generation)
            }
            None => {
                let index = u32::try_from(slots.slots.len()).map_err(|_| {
                    StorageError::Corrupted("slot table exceeds u32::MAX entries".into())
                })?;
                slots.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                Handle::new(index, 0)
            }
        };
        slots.live += 1;

        let live_bytes = self.inner.allocated_bytes.fetch_add(size, Ordering::AcqRel) + size;
        self.inner.with_stats(|s| s.record_write(size, live_bytes));
        debug!(%handle, size, live_bytes, "wrote data");
        Ok(handle)
    }

    /// Adds a reference. Returns the new count.
    pub fn inc_ref(&self, handle: Handle) -> Result<usize, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        let entry = slots.live_entry_mut(handle)?;
        entry.refs += 1;
        Ok(entry.refs)
    }

    /// Drops a reference, freeing the entry when none remain and no read
    /// is pending.
    pub fn dec_ref(&self, handle: Handle) -> Result<Release, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        let entry = slots.live_entry_mut(handle)?;
        entry.refs -= 1;
        if entry.refs > 0 {
            return Ok(Release::Retained);
        }
        if entry.pending_reads > 0 {
            entry.releasing = true;
            debug!(%handle, pending = entry.pending_reads, "release deferred");
            return Ok(Release::Deferred);
        }
        self.inner.free(&mut slots, handle, false);
        Ok(Release::Released)
    }

    /// Current reference count.
    pub fn ref_count(&self, handle: Handle) -> Result<usize, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        Ok(slots.live_entry_mut(handle)?.refs)
    }

    /// Bytes charged for `handle`.
    pub fn size_bytes(&self, handle: Handle) -> Result<usize, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        Ok(slots.live_entry_mut(handle)?.size_bytes)
    }

    /// Whether `handle` names a live (not releasing) entry.
    pub fn contains(&self, handle: Handle) -> bool {
        let Ok(mut slots) = self.inner.lock_slots() else {
            return false;
        };
        let live = slots.live_entry_mut(handle).is_ok();
        live
    }

    /// Shared access to the stored value.
    pub fn get(&self, handle: Handle) -> Result<Arc<V>, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        let value = Arc::clone(&slots.live_entry_mut(handle)?.value);
        drop(slots);
        self.inner.with_stats(StorageStats::record_read);
        Ok(value)
    }

    /// Registers a pending read. Until the returned guard is dropped the
    /// entry outlives its last reference.
    pub fn begin_read(&self, handle: Handle) -> Result<PendingRead<V>, StorageError> {
        let mut slots = self.inner.lock_slots()?;
        let entry = slots.live_entry_mut(handle)?;
        entry.pending_reads += 1;
        let value = Arc::clone(&entry.value);
        drop(slots);
        self.inner.with_stats(StorageStats::record_read);
        Ok(PendingRead::new(value, Arc::clone(&self.inner), handle))
    }

    /// Number of entries holding memory, including deferred releases.
    pub fn len(&self) -> usize {
        self.inner.lock_slots().map_or(0, |slots| slots.live)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by all entries, including deferred releases.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes.load(Ordering::Acquire)
    }

    /// Bytes left before the budget is hit; `None` when unbounded.
    pub fn available_bytes(&self) -> Option<usize> {
        self.inner
            .budget
            .map(|b| b.as_bytes().saturating_sub(self.allocated_bytes()))
    }

    pub fn budget(&self) -> Option<MemoryBudget> {
        self.inner.budget
    }

    /// Snapshot of the cumulative statistics.
    pub fn stats(&self) -> StorageStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl<V: Clone + Payload> DataStorage<V> {
    /// A copy of the stored value.
    pub fn read(&self, handle: Handle) -> Result<V, StorageError> {
        self.get(handle).map(|v| V::clone(&v))
    }
}

impl<V: Payload> Default for DataStorage<V> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<V: Payload> fmt::Debug for DataStorage<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStorage")
            .field("budget", &self.inner.budget)
            .field("entries", &self.len())
            .field("allocated_bytes", &self.allocated_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_release() {
        let storage = DataStorage::unbounded();
        let h = storage.write(vec![1u8, 2, 3]).unwrap();
        assert_eq!(storage.read(h).unwrap(), vec![1, 2, 3]);
        assert_eq!(storage.allocated_bytes(), 3);
        assert_eq!(storage.len(), 1);

        assert_eq!(storage.dec_ref(h).unwrap(), Release::Released);
        assert_eq!(storage.allocated_bytes(), 0);
        assert!(storage.is_empty());
        assert_eq!(storage.read(h), Err(StorageError::StaleHandle(h)));
    }

    #[test]
    fn test_ref_counting() {
        let storage = DataStorage::unbounded();
        let h = storage.write(vec![0u8; 8]).unwrap();
        assert_eq!(storage.inc_ref(h).unwrap(), 2);
        assert_eq!(storage.inc_ref(h).unwrap(), 3);
        assert_eq!(storage.dec_ref(h).unwrap(), Release::Retained);
        assert_eq!(storage.dec_ref(h).unwrap(), Release::Retained);
        assert_eq!(storage.ref_count(h).unwrap(), 1);
        assert_eq!(storage.dec_ref(h).unwrap(), Release::Released);
        assert!(storage.dec_ref(h).is_err());
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let storage = DataStorage::unbounded();
        let a = storage.write(vec![1u8]).unwrap();
        storage.dec_ref(a).unwrap();
        let b = storage.write(vec![2u8]).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(!storage.contains(a));
        assert_eq!(storage.read(b).unwrap(), vec![2]);
    }

    #[test]
    fn test_budget_oom() {
        let storage = DataStorage::with_budget(MemoryBudget::from_bytes(1024));
        let _a = storage.write(vec![0u8; 512]).unwrap();
        let _b = storage.write(vec![0u8; 512]).unwrap();
        let err = storage.write(vec![0u8; 1]).unwrap_err();
        assert_eq!(
            err,
            StorageError::OutOfMemory {
                requested_bytes: 1,
                available_bytes: 0,
                budget_bytes: 1024,
            }
        );
        assert_eq!(storage.stats().oom_count, 1);
        assert_eq!(storage.available_bytes(), Some(0));
    }

    #[test]
    fn test_zero_sized_values_are_stored() {
        let storage = DataStorage::with_budget(MemoryBudget::from_bytes(1));
        let h = storage.write(Vec::<u8>::new()).unwrap();
        assert_eq!(storage.size_bytes(h).unwrap(), 0);
    }

    #[test]
    fn test_pending_read_defers_release() {
        let storage = DataStorage::unbounded();
        let h = storage.write(vec![7u8; 4]).unwrap();
        let read = storage.begin_read(h).unwrap();

        assert_eq!(storage.dec_ref(h).unwrap(), Release::Deferred);
        assert!(!storage.contains(h));
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.allocated_bytes(), 4);
        assert_eq!(read.value(), &vec![7u8; 4]);

        drop(read);
        assert_eq!(storage.len(), 0);
        assert_eq!(storage.allocated_bytes(), 0);
        let stats = storage.stats();
        assert_eq!(stats.releases, 1);
        assert_eq!(stats.deferred_releases, 1);
    }

    #[test]
    fn test_concurrent_reads_release_on_last() {
        let storage = DataStorage::unbounded();
        let h = storage.write(vec![1.0f32, 2.0]).unwrap();
        let r1 = storage.begin_read(h).unwrap();
        let r2 = storage.begin_read(h).unwrap();
        storage.dec_ref(h).unwrap();
        drop(r1);
        assert_eq!(storage.len(), 1);
        assert_eq!(r2.value(), &vec![1.0, 2.0]);
        drop(r2);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_read_without_release_keeps_entry() {
        let storage = DataStorage::unbounded();
        let h = storage.write(vec![1u8]).unwrap();
        drop(storage.begin_read(h).unwrap());
        assert!(storage.contains(h));
        assert_eq!(storage.ref_count(h).unwrap(), 1);
    }

    #[test]
    fn test_stats_peak() {
        let storage = DataStorage::unbounded();
        let a = storage.write(vec![0u8; 1000]).unwrap();
        let b = storage.write(vec![0u8; 2000]).unwrap();
        storage.dec_ref(a).unwrap();
        storage.dec_ref(b).unwrap();
        let stats = storage.stats();
        assert_eq!(stats.peak_bytes, 3000);
        assert_eq!(stats.cumulative_bytes, 3000);
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.releases, 2);
    }

    #[test]
    fn test_clones_share_arena() {
        let storage = DataStorage::unbounded();
        let other = storage.clone();
        let h = storage.write(vec![5u8]).unwrap();
        assert_eq!(other.read(h).unwrap(), vec![5]);
        assert!(format!("{other:?}").contains("DataStorage"));
    }
}
