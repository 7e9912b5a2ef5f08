#![no_main]
use libfuzzer_sys::fuzz_target;

use tardiff::config::BLOCK_SIZE;
use tardiff::diff::create_diff;
use tardiff::patch::patch_forward;
use tardiff::stream::ByteStream;

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

fn zero_padded(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % BLOCK_SIZE;
    if rem != 0 {
        out.resize(out.len() + (BLOCK_SIZE - rem), 0);
    }
    out
}

// Splits the fuzz input into a source half and a target half, diffs them,
// then patches the source against that diff -- the result must match the
// (block-padded) target exactly, and the instruction stream must never
// cause a panic regardless of how the split falls on byte boundaries.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let split = data[0] as usize % (data.len().max(1));
    let (source_data, target_data) = data.split_at(split);

    let mut source = SliceStream {
        data: source_data,
        pos: 0,
    };
    let mut target = SliceStream {
        data: target_data,
        pos: 0,
    };

    let diff_bytes = match create_diff(&mut source, &mut target, Vec::new()) {
        Ok(d) => d,
        Err(_) => return,
    };

    let mut source_again = SliceStream {
        data: source_data,
        pos: 0,
    };
    let mut diff_stream = SliceStream {
        data: &diff_bytes[8..], // skip the magic create_diff already wrote
        pos: 0,
    };
    let mut output = Vec::new();
    if patch_forward(&mut source_again, &mut diff_stream, &mut output).is_ok() {
        assert_eq!(output, zero_padded(target_data));
    }
});
