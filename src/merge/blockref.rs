//! A single output block's provenance: either a block of the original
//! (first-stage) source file, or a literal block stored at a byte offset
//! in one of the input differences files.
//!
//! Rust counterpart of `tardiffmerge.c`'s `BlockRef` (`is == NULL` meant
//! "block of the original file"; here that case is its own variant
//! instead of a sentinel null pointer).

use crate::config::BLOCK_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRef {
    /// A block of the chain's original source file, at this byte offset
    /// (always a multiple of [`BLOCK_SIZE`]).
    Source { offset: u64 },
    /// A literal block stored at this byte offset within input
    /// differences file `stream` (an index into the merger's open input
    /// list).
    Diff { stream: usize, offset: u64 },
}

impl BlockRef {
    /// Whether `self` immediately follows `prev` as a source-file copy,
    /// i.e. both are `Source` and `self`'s offset is exactly one block
    /// past `prev`'s. Used to decide whether a run of copies can be
    /// packed into the same instruction.
    pub fn continues(&self, prev: &BlockRef) -> bool {
        match (prev, self) {
            (BlockRef::Source { offset: p }, BlockRef::Source { offset: s }) => {
                *s == *p + BLOCK_SIZE as u64
            }
            _ => false,
        }
    }
}
