//! Backward patch executor: source is read sequentially (never seeked),
//! output is seekable and re-read for the final digest.
//!
//! Rust port of `patch-backward.c`'s three-pass scheme:
//!
//! 1. Walk the instruction stream once. Literal (append) blocks are
//!    written to the output immediately, at their sequential position.
//!    Each copy instruction instead stages `(source_index, target_index)`
//!    pairs in an external sort keyed by source index, and reserves its
//!    output slot with a zero-filled placeholder block.
//! 2. Read the source sequentially exactly once. As each source block
//!    comes into view, every staged copy whose `source_index` matches is
//!    written to its `target_index` slot in the output (seeking only when
//!    the target position differs from wherever the last write left off).
//! 3. Re-read the output from the start and compute its digest.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::block::read_fixed;
use crate::config::{BLOCK_SIZE, SORT_CACHE_BLOCKS};
use crate::digest::RunningDigest;
use crate::error::{Result, TarDiffError};
use crate::format::Instruction;
use crate::sort::{CopyRecord, ExternalSorter};
use crate::stream::ByteStream;

/// Applies the instruction stream in `diff` to `source`, writing the
/// reconstructed target into `output` (which must support read, write,
/// and seek -- e.g. a regular file opened for read/write). Returns the
/// digest computed over the written bytes.
pub fn patch_backward<F: Read + Write + Seek>(
    source: &mut dyn ByteStream,
    diff: &mut dyn ByteStream,
    output: &mut F,
) -> Result<[u8; 16]> {
    let mut sorter: ExternalSorter<CopyRecord> = ExternalSorter::new(SORT_CACHE_BLOCKS)?;
    let mut target_len: u32 = 0;
    let zero_block = vec![0u8; BLOCK_SIZE];
    let mut buf = vec![0u8; BLOCK_SIZE];

    // Pass 1: stage copies, write appends immediately.
    loop {
        let inst = match Instruction::read(&mut crate::stream::AsRead(diff))? {
            Some(inst) => inst,
            None => return Err(TarDiffError::TruncatedDiff),
        };
        if inst.is_terminator() {
            break;
        }

        for i in 0..inst.copy_count as u32 {
            sorter.add(CopyRecord {
                source_index: inst.seek + i,
                target_index: target_len,
            })?;
            output.write_all(&zero_block)?;
            target_len += 1;
        }

        for _ in 0..inst.append_count {
            read_fixed(diff, &mut buf)?;
            output.write_all(&buf)?;
            target_len += 1;
        }
    }

    // Pass 2: stream the source sequentially, satisfying staged copies in
    // source order.
    let copies = sorter.collect()?;
    let mut source_index: u32 = 0;
    let mut output_cursor: u32 = target_len; // wherever pass 1 left the cursor
    for copy in &copies {
        while source_index <= copy.source_index {
            read_fixed(source, &mut buf)?;
            source_index += 1;
        }
        if copy.target_index != output_cursor {
            output.seek(SeekFrom::Start(copy.target_index as u64 * BLOCK_SIZE as u64))?;
        }
        output.write_all(&buf)?;
        output_cursor = copy.target_index + 1;
    }

    // Pass 3: re-read the output from the start to compute its digest.
    output.seek(SeekFrom::Start(0))?;
    let mut digest = RunningDigest::new();
    for _ in 0..target_len {
        output.read_exact(&mut buf)?;
        digest.update(&buf);
    }
    Ok(digest.finalize())
}
