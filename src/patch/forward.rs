//! Forward patch executor: source is seekable, output is streamed.
//!
//! Rust port of `patch-forward.c`/`tarpatch.c::process_diff`: read one
//! instruction at a time, seek the source to `BS*S` and stream `C` blocks
//! from it, then stream `A` literal blocks straight from the diff,
//! hashing every output block as it is written.

use std::io::Write;

use crate::block::read_fixed;
use crate::config::BLOCK_SIZE;
use crate::digest::RunningDigest;
use crate::error::{Result, TarDiffError};
use crate::format::Instruction;
use crate::stream::ByteStream;

/// Applies the instruction stream in `diff` (its `tardiff0` header must
/// already have been consumed by the caller) to `source`, writing the
/// reconstructed target to `out`. Returns the digest computed over the
/// written bytes; the caller compares it against the digest stored in the
/// diff's footer.
pub fn patch_forward<W: Write>(
    source: &mut dyn ByteStream,
    diff: &mut dyn ByteStream,
    out: &mut W,
) -> Result<[u8; 16]> {
    let mut digest = RunningDigest::new();
    let mut buf = vec![0u8; BLOCK_SIZE];

    loop {
        let inst = match Instruction::read(&mut crate::stream::AsRead(diff))? {
            Some(inst) => inst,
            None => return Err(TarDiffError::TruncatedDiff),
        };
        if inst.is_terminator() {
            break;
        }

        if inst.copy_count > 0 {
            if !source.try_seek(BLOCK_SIZE as u64 * inst.seek as u64) {
                return Err(TarDiffError::InvalidInstruction);
            }
            for _ in 0..inst.copy_count {
                read_fixed(source, &mut buf)?;
                out.write_all(&buf)?;
                digest.update(&buf);
            }
        }

        for _ in 0..inst.append_count {
            read_fixed(diff, &mut buf)?;
            out.write_all(&buf)?;
            digest.update(&buf);
        }
    }

    Ok(digest.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::create_diff;
    use crate::format;

    struct SliceStream<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> ByteStream for SliceStream<'a> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = std::cmp::min(buf.len(), self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
        fn try_seek(&mut self, pos: u64) -> bool {
            if pos as usize > self.data.len() {
                return false;
            }
            self.pos = pos as usize;
            true
        }
        fn is_seekable(&self) -> bool {
            true
        }
    }

    #[test]
    fn round_trips_through_a_generated_diff() {
        let source_data: Vec<u8> = (0..8u8).flat_map(|b| vec![b; BLOCK_SIZE]).collect();
        let target_data: Vec<u8> = vec![
            source_data[BLOCK_SIZE * 3..BLOCK_SIZE * 5].to_vec(),
            vec![99u8; BLOCK_SIZE],
            source_data[0..BLOCK_SIZE].to_vec(),
        ]
        .concat();

        let mut src_for_diff = SliceStream {
            data: &source_data,
            pos: 0,
        };
        let mut tgt_for_diff = SliceStream {
            data: &target_data,
            pos: 0,
        };
        let diff_bytes = create_diff(&mut src_for_diff, &mut tgt_for_diff, Vec::new()).unwrap();

        let mut diff_cursor = &diff_bytes[..];
        assert!(format::read_magic(&mut diff_cursor).unwrap());

        let mut source_for_patch = SliceStream {
            data: &source_data,
            pos: 0,
        };
        let mut out = Vec::new();
        patch_forward(&mut source_for_patch, &mut DiffCursor(diff_cursor), &mut out).unwrap();

        assert_eq!(out, target_data);
    }

    struct DiffCursor<'a>(&'a [u8]);
    impl<'a> ByteStream for DiffCursor<'a> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = std::cmp::min(buf.len(), self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
        fn try_seek(&mut self, _pos: u64) -> bool {
            false
        }
        fn is_seekable(&self) -> bool {
            false
        }
    }
}
