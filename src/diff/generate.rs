//! End-to-end diff generation. Rust port of `tardiff.c::tardiff()`.

use std::io::Write;

use crate::block::BlockReader;
use crate::config::SORT_CACHE_BLOCKS;
use crate::digest::RunningDigest;
use crate::error::Result;
use crate::format;
use crate::sort::{ExternalSorter, SourceRecord};
use crate::stream::{AsRead, ByteStream};

use super::index::SourceIndex;
use super::writer::DiffWriter;

/// Scans `source`, sorts its blocks into a lookup table, then scans
/// `target`, writing a differences stream to `out`: the `tardiff0` header,
/// one instruction per run of copied/appended blocks, the terminator, and
/// finally the target then source whole-file digests.
pub fn create_diff<W: Write>(
    source: &mut dyn ByteStream,
    target: &mut dyn ByteStream,
    out: W,
) -> Result<W> {
    let mut sorter: ExternalSorter<SourceRecord> = ExternalSorter::new(SORT_CACHE_BLOCKS)?;
    let mut source_digest = RunningDigest::new();

    let mut source_reader = BlockReader::new(AsRead(source));
    while let Some(block) = source_reader.next_block()? {
        source_digest.update(&block.data);
        sorter.add(SourceRecord {
            digest: block.digest,
            index: block.index,
        })?;
    }
    let source_digest = source_digest.finalize();

    let table = sorter.mmap()?;
    let index = SourceIndex::new(&table);

    let mut out = out;
    format::write_magic(&mut out)?;
    let mut writer = DiffWriter::new(out);
    let mut target_digest = RunningDigest::new();

    let mut target_reader = BlockReader::new(AsRead(target));
    while let Some(block) = target_reader.next_block()? {
        target_digest.update(&block.data);
        let preferred = writer.preferred_index();
        match index.lookup(&block.digest, preferred) {
            Some(record) => writer.copy_block(record.index)?,
            None => writer.append_block(&block.data)?,
        }
    }
    let target_digest = target_digest.finalize();

    let mut out = writer.into_inner()?;
    format::write_footer(&mut out, &target_digest, &source_digest)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

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
            self.pos = pos as usize;
            true
        }
        fn is_seekable(&self) -> bool {
            true
        }
    }

    #[test]
    fn identical_files_diff_to_a_pure_copy_run() {
        let data = vec![42u8; 512 * 4];
        let mut source = SliceStream {
            data: &data,
            pos: 0,
        };
        let mut target = SliceStream {
            data: &data,
            pos: 0,
        };
        let diff = create_diff(&mut source, &mut target, Vec::new()).unwrap();
        assert!(diff.starts_with(b"tardiff0"));
    }

    #[test]
    fn disjoint_files_diff_to_pure_appends() {
        let source_data = vec![1u8; 512 * 2];
        let target_data = vec![2u8; 512 * 2];
        let mut source = SliceStream {
            data: &source_data,
            pos: 0,
        };
        let mut target = SliceStream {
            data: &target_data,
            pos: 0,
        };
        let diff = create_diff(&mut source, &mut target, Vec::new()).unwrap();
        assert!(diff.len() > 8 + 8 + 512 * 2);
    }
}
