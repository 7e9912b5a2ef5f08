//! Merges a chain of differences files into one equivalent file. Rust port
//! of `tardiffmerge.c`.
//!
//! A merged diff is described, block by block, by a [`BlockRef`] array: each
//! output block either comes from the original (first-stage) source file or
//! from a literal stored in one of the chain's input diffs. Each stage's
//! array is built from the previous one plus the stage's own instructions,
//! then the previous array is dropped and replaced.

mod blockref;

pub use blockref::BlockRef;

use std::io::{Read, Seek, SeekFrom, Write};

use memmap2::Mmap;
use tempfile::tempfile;

use crate::block::read_fixed;
use crate::config::{BLOCK_SIZE, DIGEST_SIZE, MAX_DIFF_FILES, MERGE_MAX_RUN};
use crate::error::{Result, TarDiffError};
use crate::format::{self, Instruction};
use crate::stream::ByteStream;

const BLOCKREF_WIDTH: usize = 1 + 8 + 8; // tag byte, stream index (as u64), offset

/// The state carried between stages of a merge: the block-reference array
/// describing the current intermediate target file, plus what's known of
/// its digest chain. `blocks` lives in a temp file and is re-mapped after
/// each stage, mirroring `tardiffmerge.c`'s `last_blocks`/`last_num_blocks`.
pub struct Merger {
    blocks: Option<Mmap>,
    num_blocks: usize,
    last_digest: Option<[u8; DIGEST_SIZE]>,
    orig_digest: Option<[u8; DIGEST_SIZE]>,
    stage: usize,
}

impl Merger {
    pub fn new() -> Self {
        Merger {
            blocks: None,
            num_blocks: 0,
            last_digest: None,
            orig_digest: None,
            stage: 0,
        }
    }

    fn get(&self, i: usize) -> BlockRef {
        decode_blockref(&self.blocks.as_ref().unwrap()[i * BLOCKREF_WIDTH..(i + 1) * BLOCKREF_WIDTH])
    }

    /// Ingests one differences file (its `tardiff0` header already
    /// consumed), translating its instructions against the current
    /// `blocks` array and replacing it with the new one. `stream` is the
    /// index this diff will be referenced by if any of its literal blocks
    /// survive into the merged output; the caller keeps the corresponding
    /// open input alive for the lifetime of the merge.
    pub fn process_input(&mut self, stream: usize, diff: &mut dyn ByteStream) -> Result<()> {
        let mut out = tempfile()?;
        let mut offset: u64 = 8; // header already consumed by the caller
        let mut num_blocks: usize = 0;
        let mut encode_buf = [0u8; BLOCKREF_WIDTH];

        loop {
            let inst = match Instruction::read(&mut crate::stream::AsRead(diff))? {
                Some(inst) => inst,
                None => return Err(TarDiffError::TruncatedDiff),
            };
            offset += 8;
            if inst.is_terminator() {
                break;
            }

            for i in 0..inst.copy_count as u32 {
                let src_index = inst.seek + i;
                let br = match &self.blocks {
                    None => BlockRef::Source {
                        offset: BLOCK_SIZE as u64 * src_index as u64,
                    },
                    Some(_) => {
                        if src_index as usize >= self.num_blocks {
                            return Err(TarDiffError::InvalidBlockIndex {
                                index: src_index,
                                len: self.num_blocks,
                            });
                        }
                        self.get(src_index as usize)
                    }
                };
                encode_blockref(&br, &mut encode_buf);
                out.write_all(&encode_buf)?;
                num_blocks += 1;
            }

            for _ in 0..inst.append_count {
                let br = BlockRef::Diff { stream, offset };
                encode_blockref(&br, &mut encode_buf);
                out.write_all(&encode_buf)?;
                offset += BLOCK_SIZE as u64;
                num_blocks += 1;
            }
            // Literal data is re-read later, from generate_output; skip
            // past it now rather than buffering it, as `tardiffmerge.c`'s
            // `is->seek(is, offset)` does at the end of each instruction.
            if inst.append_count > 0 && !diff.try_seek(offset) {
                return Err(TarDiffError::InvalidInstruction);
            }
        }

        let (target_digest, source_digest) = format::read_footer_digests(&mut crate::stream::AsRead(diff))?;
        if let Some(src) = source_digest {
            match &self.last_digest {
                None => {
                    self.orig_digest = Some(src);
                }
                Some(prev_target) => {
                    if src != *prev_target {
                        return Err(TarDiffError::OrderingFailure);
                    }
                }
            }
        } else {
            crate::diagnostics::warn(
                "differences file is missing original file digest; patch integrity cannot be guaranteed",
            );
        }
        self.last_digest = Some(target_digest);

        out.flush()?;
        self.blocks = if num_blocks == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&out)? })
        };
        self.num_blocks = num_blocks;
        self.stage += 1;
        Ok(())
    }

    /// After every input has been ingested, writes the composed diff (magic,
    /// instructions, terminator, target digest, and the original source
    /// digest if it is known) to `out`. Matches `tardiffmerge.c`'s
    /// `generate_output`, reading literal blocks back out of `open_diffs`
    /// (indexed the same way `stream` was in [`process_input`]).
    pub fn generate_output<W: Write>(
        &self,
        open_diffs: &mut [&mut dyn ByteStream],
        mut out: W,
    ) -> Result<W> {
        format::write_magic(&mut out)?;

        let n = self.num_blocks;
        let mut i = 0usize;
        while i < n {
            let br = self.get(i);
            let mut j = i + 1;
            match br {
                BlockRef::Source { .. } => {
                    while j < n
                        && j - i < MERGE_MAX_RUN as usize
                        && self.get(j).continues(&self.get(j - 1))
                    {
                        j += 1;
                    }
                    self.emit_copy_run(i, j, &mut out)?;
                }
                BlockRef::Diff { .. } => {
                    while j < n && j - i < MERGE_MAX_RUN as usize && matches!(self.get(j), BlockRef::Diff { .. }) {
                        j += 1;
                    }
                    self.emit_append_run(i, j, open_diffs, &mut out)?;
                }
            }
            i = j;
        }

        Instruction::TERMINATOR.write(&mut out)?;
        let target_digest = self.last_digest.ok_or(TarDiffError::InvalidInstruction)?;
        let source_digest = match self.orig_digest {
            Some(d) => d,
            None => {
                crate::diagnostics::warn(
                    "original file digest unknown; generating version 1.0 differences file",
                );
                [0u8; DIGEST_SIZE]
            }
        };
        out.write_all(&target_digest)?;
        if self.orig_digest.is_some() {
            out.write_all(&source_digest)?;
        }
        Ok(out)
    }

    fn emit_copy_run<W: Write>(&self, start: usize, end: usize, out: &mut W) -> Result<()> {
        let first = self.get(start);
        let seek = match first {
            BlockRef::Source { offset } => (offset / BLOCK_SIZE as u64) as u32,
            BlockRef::Diff { .. } => unreachable!("copy run must be all-Source"),
        };
        Instruction {
            seek,
            copy_count: (end - start) as u16,
            append_count: 0,
        }
        .write(out)?;
        Ok(())
    }

    fn emit_append_run<W: Write>(
        &self,
        start: usize,
        end: usize,
        open_diffs: &mut [&mut dyn ByteStream],
        out: &mut W,
    ) -> Result<()> {
        Instruction {
            seek: crate::config::NO_SEEK,
            copy_count: 0,
            append_count: (end - start) as u16,
        }
        .write(out)?;
        let mut buf = [0u8; BLOCK_SIZE];
        for idx in start..end {
            match self.get(idx) {
                BlockRef::Diff { stream, offset } => {
                    let source = &mut *open_diffs[stream];
                    if !source.try_seek(offset) {
                        return Err(TarDiffError::InvalidInstruction);
                    }
                    read_fixed(source, &mut buf)?;
                    out.write_all(&buf)?;
                }
                BlockRef::Source { .. } => unreachable!("append run must be all-Diff"),
            }
        }
        Ok(())
    }
}

impl Default for Merger {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_blockref(br: &BlockRef, out: &mut [u8; BLOCKREF_WIDTH]) {
    match br {
        BlockRef::Source { offset } => {
            out[0] = 0;
            out[1..9].copy_from_slice(&0u64.to_be_bytes());
            out[9..17].copy_from_slice(&offset.to_be_bytes());
        }
        BlockRef::Diff { stream, offset } => {
            out[0] = 1;
            out[1..9].copy_from_slice(&(*stream as u64).to_be_bytes());
            out[9..17].copy_from_slice(&offset.to_be_bytes());
        }
    }
}

fn decode_blockref(buf: &[u8]) -> BlockRef {
    let mut off_buf = [0u8; 8];
    off_buf.copy_from_slice(&buf[9..17]);
    let offset = u64::from_be_bytes(off_buf);
    if buf[0] == 0 {
        BlockRef::Source { offset }
    } else {
        let mut s_buf = [0u8; 8];
        s_buf.copy_from_slice(&buf[1..9]);
        BlockRef::Diff {
            stream: u64::from_be_bytes(s_buf) as usize,
            offset,
        }
    }
}

/// Merges `diffs` (each diff's `tardiff0` header already consumed, in
/// chain order source-to-target) into a single equivalent differences file
/// written to `out`. `diffs.len()` must not exceed [`MAX_DIFF_FILES`].
pub fn merge_chain<W: Write>(diffs: &mut [&mut dyn ByteStream], mut out: W) -> Result<W> {
    if diffs.is_empty() || diffs.len() > MAX_DIFF_FILES {
        return Err(TarDiffError::InvalidInstruction);
    }
    let mut merger = Merger::new();
    for (stream, diff) in diffs.iter_mut().enumerate() {
        merger.process_input(stream, *diff)?;
    }
    out = merger.generate_output(diffs, out)?;
    Ok(out)
}
