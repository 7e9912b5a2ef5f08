//! Lookup of source blocks by digest, with a preference for extending the
//! current copy run.
//!
//! Rust port of `tardiff.c::lookup`: binary search the sorted table for
//! the range of records sharing `digest` (an initial binary search for the
//! lower bound, then a doubling probe to find the upper bound before a
//! second binary search -- avoiding an O(n) scan when one digest repeats
//! many times), then within that range prefer the record whose index
//! equals `preferred_index` so the diff writer can keep extending a copy
//! run instead of starting a new instruction.

use crate::sort::{SortedTable, SourceRecord};

/// Read-only view over the sorted source block table, used to resolve
/// each target block's digest to a source block index.
pub struct SourceIndex<'a> {
    table: &'a SortedTable<SourceRecord>,
}

impl<'a> SourceIndex<'a> {
    pub fn new(table: &'a SortedTable<SourceRecord>) -> Self {
        SourceIndex { table }
    }

    /// Returns the record whose index equals `preferred_index`, if the
    /// digest matches any record at all and one happens to sit at that
    /// index; otherwise the first matching record in sorted order;
    /// otherwise `None` if no record shares the digest.
    pub fn lookup(&self, digest: &[u8; 16], preferred_index: u32) -> Option<SourceRecord> {
        let n = self.table.len();
        if n == 0 {
            return None;
        }

        // Binary search for the first record with digest >= target.
        let mut lo = 0usize;
        let mut hi = n;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.table.get(mid).digest < *digest {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == n || self.table.get(lo).digest != *digest {
            return None;
        }
        let first = lo;

        // Doubling probe for the first record with digest > target, then a
        // second binary search within [first+1, probe) for the exact
        // upper bound.
        let mut probe_lo = first + 1;
        let mut probe_hi = first + 1;
        while probe_hi < n {
            if self.table.get(probe_hi).digest > *digest {
                break;
            }
            probe_hi += probe_hi - first;
        }
        if probe_hi > n {
            probe_hi = n;
        }
        let mut lo2 = probe_lo;
        let mut hi2 = probe_hi;
        while lo2 < hi2 {
            let mid = lo2 + (hi2 - lo2) / 2;
            if self.table.get(mid).digest > *digest {
                hi2 = mid;
            } else {
                lo2 = mid + 1;
            }
        }
        let upper = lo2; // exclusive end of the matching range [first, upper)

        if upper - first > 1 {
            // Multiple candidates: binary search for one at preferred_index.
            let mut lo3 = first;
            let mut hi3 = upper;
            while lo3 < hi3 {
                let mid = lo3 + (hi3 - lo3) / 2;
                let rec = self.table.get(mid);
                if rec.index == preferred_index {
                    return Some(rec);
                }
                if rec.index < preferred_index {
                    lo3 = mid + 1;
                } else {
                    hi3 = mid;
                }
            }
        }

        Some(self.table.get(first))
    }
}
