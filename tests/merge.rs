//! Property 3: merge associativity -- `merge(diff(F0,F1), diff(F1,F2))`
//! applied to `F0` yields the same result (and digest) as `diff(F0, F2)`
//! applied to `F0` would, even though the merged bytes need not be
//! identical to a directly produced diff.

use tardiff::config::BLOCK_SIZE;
use tardiff::diff::create_diff;
use tardiff::format;
use tardiff::merge::merge_chain;
use tardiff::patch::patch_forward;
use tardiff::stream::{AsRead, ByteStream};

struct SliceStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteStream for SliceStream<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = std::cmp::min(buf.len(), self.data.len().saturating_sub(self.pos));
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

fn diff_bytes(source: &[u8], target: &[u8]) -> Vec<u8> {
    create_diff(
        &mut SliceStream {
            data: source,
            pos: 0,
        },
        &mut SliceStream {
            data: target,
            pos: 0,
        },
        Vec::new(),
    )
    .unwrap()
}

fn apply(source: &[u8], diff: &[u8]) -> (Vec<u8>, [u8; 16]) {
    let mut source_stream = SliceStream {
        data: source,
        pos: 0,
    };
    let mut diff_stream = SliceStream {
        data: &diff[8..],
        pos: 0,
    };
    let mut out = Vec::new();
    let digest = patch_forward(&mut source_stream, &mut diff_stream, &mut out).unwrap();
    (out, digest)
}

fn check_merge_associativity(f0: &[u8], f1: &[u8], f2: &[u8]) {
    let diff01 = diff_bytes(f0, f1);
    let diff12 = diff_bytes(f1, f2);
    let direct02 = diff_bytes(f0, f2);

    // `merge_chain` seeks diffs using absolute file offsets (the magic
    // occupies bytes 0..8); the stream must keep the full byte range and
    // have its magic consumed in place, not be built from a stripped slice.
    let mut d01 = SliceStream {
        data: &diff01[..],
        pos: 0,
    };
    assert!(format::read_magic(&mut AsRead(&mut d01)).unwrap());
    let mut d12 = SliceStream {
        data: &diff12[..],
        pos: 0,
    };
    assert!(format::read_magic(&mut AsRead(&mut d12)).unwrap());
    let merged = merge_chain(&mut [&mut d01, &mut d12], Vec::new()).unwrap();

    let (via_merge, merge_digest) = apply(f0, &merged);
    let (via_direct, direct_digest) = apply(f0, &direct02);

    assert_eq!(via_merge, via_direct);
    assert_eq!(merge_digest, direct_digest);
}

#[test]
fn three_stage_chain_with_appends_and_copies() {
    fn block(byte: u8) -> Vec<u8> {
        vec![byte; BLOCK_SIZE]
    }
    let f0 = [block(b'A'), block(b'B')].concat();
    let f1 = [block(b'B'), block(b'A'), block(b'C')].concat();
    let f2 = [block(b'C'), block(b'D'), block(b'A')].concat();
    check_merge_associativity(&f0, &f1, &f2);
}

#[test]
fn chain_where_middle_stage_is_pure_append() {
    fn block(byte: u8) -> Vec<u8> {
        vec![byte; BLOCK_SIZE]
    }
    let f0 = block(b'X');
    let f1 = [block(b'X'), block(b'Y')].concat();
    let f2 = [block(b'X'), block(b'Y'), block(b'Z')].concat();
    check_merge_associativity(&f0, &f1, &f2);
}

#[test]
fn four_stage_chain() {
    fn block(byte: u8) -> Vec<u8> {
        vec![byte; BLOCK_SIZE]
    }
    let f0 = block(1);
    let f1 = [block(1), block(2)].concat();
    let f2 = [block(2), block(1), block(3)].concat();
    let f3 = [block(3), block(4), block(2)].concat();

    let diff01 = diff_bytes(&f0, &f1);
    let diff12 = diff_bytes(&f1, &f2);
    let diff23 = diff_bytes(&f2, &f3);
    let direct03 = diff_bytes(&f0, &f3);

    let mut d01 = SliceStream {
        data: &diff01[..],
        pos: 0,
    };
    assert!(format::read_magic(&mut AsRead(&mut d01)).unwrap());
    let mut d12 = SliceStream {
        data: &diff12[..],
        pos: 0,
    };
    assert!(format::read_magic(&mut AsRead(&mut d12)).unwrap());
    let mut d23 = SliceStream {
        data: &diff23[..],
        pos: 0,
    };
    assert!(format::read_magic(&mut AsRead(&mut d23)).unwrap());
    let merged = merge_chain(&mut [&mut d01, &mut d12, &mut d23], Vec::new()).unwrap();

    let (via_merge, merge_digest) = apply(&f0, &merged);
    let (via_direct, direct_digest) = apply(&f0, &direct03);
    assert_eq!(via_merge, via_direct);
    assert_eq!(merge_digest, direct_digest);
}
