//! Whole-file MD5 digest, used to tag source/target files in a diff's
//! footer and to verify patched output (distilled spec §4.2/§4.6/§4.7).
//!
//! Grounded in `AiBrush-fcoreutils::hash::core`'s streaming
//! `md5::Md5`/`digest::Digest` usage, substituted here for the original's
//! `openssl/md5.h` (`MD5_Init`/`MD5_Update`/`MD5_Final`).

use md5::Md5;
use digest::Digest;

use crate::config::DIGEST_SIZE;

/// Accumulates a digest over a sequence of reads without buffering the
/// whole file.
pub struct RunningDigest {
    hasher: Md5,
}

impl RunningDigest {
    pub fn new() -> Self {
        RunningDigest { hasher: Md5::new() }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> [u8; DIGEST_SIZE] {
        self.hasher.finalize().into()
    }
}

impl Default for RunningDigest {
    fn default() -> Self {
        Self::new()
    }
}

/// Digests a single block's worth of data in one call, for callers that
/// already hold the bytes in memory (block-level digests, not whole-file).
pub fn digest_block(data: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_has_stable_digest() {
        let d1 = RunningDigest::new().finalize();
        let d2 = digest_block(&[]);
        assert_eq!(d1, d2);
    }

    #[test]
    fn streamed_update_matches_single_call() {
        let mut running = RunningDigest::new();
        running.update(b"hello, ");
        running.update(b"world");
        let streamed = running.finalize();
        let single = digest_block(b"hello, world");
        assert_eq!(streamed, single);
    }

    #[test]
    fn different_input_differs() {
        assert_ne!(digest_block(b"a"), digest_block(b"b"));
    }
}
