// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Cumulative storage statistics.

/// Counters describing how a [`DataStorage`](crate::DataStorage) has been
/// used since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    /// Successful writes.
    pub writes: u64,
    /// Reads served, synchronous and guarded.
    pub reads: u64,
    /// Entries freed.
    pub releases: u64,
    /// Releases that had to wait for pending reads to finish.
    pub deferred_releases: u64,
    /// Writes rejected by the budget.
    pub oom_count: u64,
    /// High-water mark of live bytes.
    pub peak_bytes: usize,
    /// Total bytes ever written.
    pub cumulative_bytes: u64,
}

impl StorageStats {
    pub(crate) fn record_write(&mut self, size: usize, live_bytes: usize) {
        self.writes += 1;
        self.cumulative_bytes += size as u64;
        self.peak_bytes = self.peak_bytes.max(live_bytes);
    }

    pub(crate) fn record_read(&mut self) {
        self.reads += 1;
    }

    pub(crate) fn record_release(&mut self, deferred: bool) {
        self.releases += 1;
        if deferred {
            self.deferred_releases += 1;
        }
    }

    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_bytes as f64 / (1024.0 * 1024.0);
        format!(
            "Writes: {}, reads: {}, releases: {} ({} deferred), {} OOMs, peak {:.2} MB",
            self.writes, self.reads, self.releases, self.deferred_releases, self.oom_count, peak_mb,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_never_decreases() {
        let mut s = StorageStats::default();
        s.record_write(100, 100);
        s.record_write(50, 150);
        s.record_write(10, 40);
        assert_eq!(s.peak_bytes, 150);
        assert_eq!(s.cumulative_bytes, 160);
        assert_eq!(s.writes, 3);
    }

    #[test]
    fn test_summary() {
        let mut s = StorageStats::default();
        s.record_write(1024 * 1024, 1024 * 1024);
        s.record_release(true);
        s.record_oom();
        let line = s.summary();
        assert!(line.contains("Writes: 1"));
        assert!(line.contains("releases: 1 (1 deferred)"));
        assert!(line.contains("1 OOMs"));
        assert!(line.contains("peak 1.00 MB"));
    }
}
