// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget configuration and parsing.

use crate::StorageError;
use std::fmt;
use std::str::FromStr;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// A hard ceiling on the bytes a [`DataStorage`](crate::DataStorage) may hold.
///
/// # Parsing
/// Case-insensitive, surrounding whitespace ignored:
/// - `"512M"` / `"512MB"` → 512 × 1024² bytes
/// - `"1G"` / `"1GB"` → 1024³ bytes
/// - `"2048K"` / `"2048KB"` → 2048 × 1024 bytes
/// - `"4096"` / `"4096B"` → raw byte count
///
/// ```
/// use data_storage::MemoryBudget;
///
/// let b: MemoryBudget = "1G".parse().unwrap();
/// assert_eq!(b.as_mb(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * KB }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MB }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Budget in megabytes, truncated.
    pub fn as_mb(&self) -> usize {
        self.bytes / MB
    }

    /// Parses a human-readable budget string.
    pub fn parse(input: &str) -> Result<Self, StorageError> {
        let s = input.trim();
        let invalid = |reason: &str| StorageError::InvalidBudget {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        if s.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = s.to_ascii_uppercase();
        let (digits, multiplier) = [("GB", GB), ("G", GB), ("MB", MB), ("M", MB), ("KB", KB), ("K", KB), ("B", 1)]
            .iter()
            .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|d| (d, *mult)))
            .unwrap_or((upper.as_str(), 1));

        let value: usize = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional K, M or G suffix"))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value overflows a byte count"))?;
        if bytes == 0 {
            return Err(StorageError::ZeroBudget);
        }
        Ok(Self { bytes })
    }
}

impl FromStr for MemoryBudget {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bytes {
            b if b >= GB && b % GB == 0 => write!(f, "{} GB", b / GB),
            b if b >= MB && b % MB == 0 => write!(f, "{} MB", b / MB),
            b if b >= KB && b % KB == 0 => write!(f, "{} KB", b / KB),
            b => write!(f, "{b} B"),
        }
    }
}
