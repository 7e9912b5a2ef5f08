//! Criterion benchmarks for end-to-end diff generation.
//!
//! Run with:
//!   cargo bench --bench diff_generation

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tardiff::config::BLOCK_SIZE;
use tardiff::diff::create_diff;
use tardiff::stream::ByteStream;

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

/// A block-quantized pseudo-random byte sequence, reproducible without
/// `rand` -- a linear congruential step seeded by the block index, matching
/// the synthetic-corpus style `jafreck-lz4r`'s `corpus.rs` falls back to
/// when no real corpus directory is configured.
fn synthetic_blocks(num_blocks: usize, seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(num_blocks * BLOCK_SIZE);
    let mut state = seed;
    for _ in 0..num_blocks {
        let mut block = [0u8; BLOCK_SIZE];
        for byte in block.iter_mut() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *byte = (state >> 56) as u8;
        }
        out.extend_from_slice(&block);
    }
    out
}

fn bench_diff_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_generation");

    for &num_blocks in &[256usize, 4096] {
        let source = synthetic_blocks(num_blocks, 1);
        // Target reuses every other source block (so the writer alternates
        // copy and append runs) plus some genuinely new blocks appended.
        let mut target = Vec::with_capacity(source.len());
        for i in (0..num_blocks).step_by(2) {
            target.extend_from_slice(&source[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE]);
        }
        target.extend_from_slice(&synthetic_blocks(num_blocks / 4, 2));

        group.throughput(Throughput::Bytes(target.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("create_diff", num_blocks),
            &(source, target),
            |b, (source, target)| {
                b.iter(|| {
                    let mut source_stream = SliceStream {
                        data: source,
                        pos: 0,
                    };
                    let mut target_stream = SliceStream {
                        data: target,
                        pos: 0,
                    };
                    create_diff(&mut source_stream, &mut target_stream, Vec::new()).unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_diff_generation);
criterion_main!(benches);
