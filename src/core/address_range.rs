//! AddressRange and AddressRangeSet types.
//!
//! `AddressRange` is a half-open `[start, end)` interval of virtual
//! addresses. `AddressRangeSet` keeps a disjoint collection of them keyed
//! by start, merging on insert and splitting on remove. The decoder uses
//! one set for decodable code, one for fallback (data/unclassified) bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A half-open contiguous region `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AddressRange {
    /// First address in the range (inclusive)
    pub start: u64,
    /// One past the last address (exclusive)
    pub end: u64,
}

impl AddressRange {
    /// Create a new range. Returns `None` for empty or inverted bounds.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Size of the range in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Get the intersection of this range with another range.
    pub fn intersection(&self, other: &AddressRange) -> Option<AddressRange> {
        AddressRange::new(self.start.max(other.start), self.end.min(other.end))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x}, {:#x})", self.start, self.end)
    }
}

/// Disjoint, mergeable set of address ranges.
///
/// Invariant: stored ranges never overlap and never touch; adjacent
/// inserts are coalesced into one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRangeSet {
    /// start -> end (exclusive)
    ranges: BTreeMap<u64, u64>,
}

impl AddressRangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `[start, end)`, merging with every overlapping or adjacent
    /// range. Empty or inverted bounds are ignored.
    pub fn insert(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        let mut new_start = start;
        let mut new_end = end;

        // A range starting before `start` may reach into (or touch) us.
        if let Some((&s, &e)) = self.ranges.range(..start).next_back() {
            if e >= start {
                new_start = s;
                new_end = new_end.max(e);
            }
        }

        // Absorb every range starting inside [new_start, new_end].
        let absorbed: Vec<u64> = self
            .ranges
            .range(new_start..=new_end)
            .map(|(&s, _)| s)
            .collect();
        for s in absorbed {
            if let Some(e) = self.ranges.remove(&s) {
                new_end = new_end.max(e);
            }
        }

        self.ranges.insert(new_start, new_end);
    }

    pub fn insert_range(&mut self, range: AddressRange) {
        self.insert(range.start, range.end);
    }

    /// Remove `[start, end)`. A range that only partially overlaps keeps
    /// its remainder(s), so one stored range can split into two.
    pub fn remove(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        let mut touched: Vec<(u64, u64)> = Vec::new();
        if let Some((&s, &e)) = self.ranges.range(..start).next_back() {
            if e > start {
                touched.push((s, e));
            }
        }
        touched.extend(self.ranges.range(start..end).map(|(&s, &e)| (s, e)));

        for (s, e) in touched {
            self.ranges.remove(&s);
            if s < start {
                self.ranges.insert(s, start);
            }
            if e > end {
                self.ranges.insert(end, e);
            }
        }
    }

    pub fn remove_range(&mut self, range: &AddressRange) {
        self.remove(range.start, range.end);
    }

    /// The stored range containing `addr`, if any.
    pub fn range_containing(&self, addr: u64) -> Option<AddressRange> {
        let (&s, &e) = self.ranges.range(..=addr).next_back()?;
        if addr < e {
            Some(AddressRange { start: s, end: e })
        } else {
            None
        }
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.range_containing(addr).is_some()
    }

    /// Number of disjoint ranges
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of bytes covered.
    pub fn total_size(&self) -> u64 {
        self.ranges.iter().map(|(s, e)| e - s).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = AddressRange> + '_ {
        self.ranges
            .iter()
            .map(|(&start, &end)| AddressRange { start, end })
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

impl fmt::Display for AddressRangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in self.iter() {
            writeln!(f, "{}", r)?;
        }
        Ok(())
    }
}
