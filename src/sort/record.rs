//! Fixed-width records the external sorter can order and persist.
//!
//! `binsort.c` sorts opaque `block_size`-byte records with `memcmp`; this
//! crate needs two concrete record shapes (the source block table and the
//! backward patcher's copy plan), so instead of sorting raw bytes this
//! trait lets each record type supply its own total order and its own
//! fixed-width encoding.

use std::cmp::Ordering;

use crate::config::DIGEST_SIZE;

/// A record the external sorter can store, compare, and serialize.
pub trait SortRecord: Clone {
    /// Encoded size in bytes. Every record of a given type must encode to
    /// exactly this many bytes.
    const WIDTH: usize;

    fn encode(&self, out: &mut [u8]);
    fn decode(buf: &[u8]) -> Self;

    /// Total order used to build sorted runs. Comparing by encoded bytes
    /// (as `memcmp` does in `binsort.c`) is equivalent to this for every
    /// record type in this crate, but each type states its own comparator
    /// so the intent ("sort by digest, then by index") stays readable at
    /// the call site.
    fn cmp_records(a: &Self, b: &Self) -> Ordering;
}

/// A source block's digest and index, the record type `tardiff.c` calls
/// `BlockInfo` (`sizeof(BlockInfo) == 20`: 16-byte digest + 4-byte index).
/// Sorted by digest, then by index, matching `tardiff.c::lookup`'s
/// assumption that all records sharing a digest form one contiguous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRecord {
    pub digest: [u8; DIGEST_SIZE],
    pub index: u32,
}

impl SortRecord for SourceRecord {
    const WIDTH: usize = DIGEST_SIZE + 4;

    fn encode(&self, out: &mut [u8]) {
        out[..DIGEST_SIZE].copy_from_slice(&self.digest);
        out[DIGEST_SIZE..DIGEST_SIZE + 4].copy_from_slice(&self.index.to_be_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&buf[..DIGEST_SIZE]);
        let mut idx_buf = [0u8; 4];
        idx_buf.copy_from_slice(&buf[DIGEST_SIZE..DIGEST_SIZE + 4]);
        SourceRecord {
            digest,
            index: u32::from_be_bytes(idx_buf),
        }
    }

    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        a.digest.cmp(&b.digest).then(a.index.cmp(&b.index))
    }
}

/// A staged `(source_index, target_offset)` copy instruction, the record
/// type `patch-backward.c` sorts by source index before its sequential
/// source-reading pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRecord {
    pub source_index: u32,
    pub target_index: u32,
}

impl SortRecord for CopyRecord {
    const WIDTH: usize = 8;

    fn encode(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.source_index.to_be_bytes());
        out[4..8].copy_from_slice(&self.target_index.to_be_bytes());
    }

    fn decode(buf: &[u8]) -> Self {
        let mut s = [0u8; 4];
        s.copy_from_slice(&buf[..4]);
        let mut t = [0u8; 4];
        t.copy_from_slice(&buf[4..8]);
        CopyRecord {
            source_index: u32::from_be_bytes(s),
            target_index: u32::from_be_bytes(t),
        }
    }

    fn cmp_records(a: &Self, b: &Self) -> Ordering {
        a.source_index
            .cmp(&b.source_index)
            .then(a.target_index.cmp(&b.target_index))
    }
}
