//! Classifies inputs by signature prefix, and computes the usability graph
//! the `info` report prints. Rust port of `identify.c`/`identify.h` plus
//! the `mark_diffs_usable` reachability pass from `tardiffinfo.c`.

mod report;

pub use report::{format_data_line, format_diff_line};

use crate::config::{DIGEST_SIZE, MAGIC, MAGIC_LEN};
use crate::digest::RunningDigest;
use crate::format::Instruction;
use crate::stream::ByteStream;

/// The outcome of classifying one input path.
#[derive(Clone)]
pub enum FileKind {
    /// A plain data file; `digest` is its whole-content MD5, `total_bytes`
    /// its length (prefix included).
    Data {
        digest: [u8; DIGEST_SIZE],
        total_bytes: u64,
    },
    /// A well-formed differences file.
    Diff {
        /// Source-file digest, if the diff carries one (v1.1); `None` for
        /// a v1.0 diff, which `tardiffinfo.c` treats as an all-zero digest
        /// for reachability purposes (see [`UNKNOWN_SOURCE_DIGEST`]).
        source_digest: Option<[u8; DIGEST_SIZE]>,
        target_digest: [u8; DIGEST_SIZE],
        copied: u64,
        added: u64,
    },
    /// A path that could not be read, or whose content matched neither a
    /// data file nor a well-formed diff.
    Invalid { reason: String },
}

/// The sentinel digest `mark_diffs_usable` seeds as reachable so that
/// version-1.0 diffs (missing a source digest) don't appear gratuitously
/// unusable. Matches `tardiffinfo.c`'s file-scope `static uint8_t
/// zero_digest[DS]`.
pub const UNKNOWN_SOURCE_DIGEST: [u8; DIGEST_SIZE] = [0u8; DIGEST_SIZE];

/// One classified input, carrying its path alongside the classification.
pub struct IdentifiedFile {
    pub path: String,
    pub kind: FileKind,
    pub usable: bool,
}

/// Reads up to [`MAGIC_LEN`] bytes from `stream` and classifies it: an
/// exact `tardiff0` prefix means a differences file (parsed fully, to
/// recover its digests and copy/append totals); anything else is treated
/// as plain data (digested to EOF); a short or empty read is invalid.
pub fn identify_one(path: &str, stream: &mut dyn ByteStream) -> IdentifiedFile {
    let mut prefix = [0u8; MAGIC_LEN];
    let n = read_prefix(stream, &mut prefix);
    let kind = if n == MAGIC_LEN && &prefix == MAGIC {
        parse_diff_tail(stream)
    } else if n == 0 {
        FileKind::Invalid {
            reason: "unreadable or empty file".to_string(),
        }
    } else if prefix_could_be_magic(&prefix, n) {
        FileKind::Invalid {
            reason: "incomplete signature -- file truncated?".to_string(),
        }
    } else {
        parse_data_tail(stream, &prefix[..n])
    };
    IdentifiedFile {
        path: path.to_string(),
        kind,
        usable: false,
    }
}

fn read_prefix(stream: &mut dyn ByteStream, buf: &mut [u8; MAGIC_LEN]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) | Err(_) => break,
            Ok(n) => filled += n,
        }
    }
    filled
}

/// Whether a short prefix still matches `tardiff0` as far as it goes --
/// `identify.c` treats this case ("looks like a diff but got cut off
/// before the full 8-byte signature arrived") as a distinct, more specific
/// error than "not a diff file at all".
fn prefix_could_be_magic(prefix: &[u8], n: usize) -> bool {
    n > 0 && n < MAGIC_LEN && prefix[..n] == MAGIC[..n]
}

fn parse_diff_tail(diff: &mut dyn ByteStream) -> FileKind {
    let mut total_copied: u64 = 0;
    let mut total_added: u64 = 0;
    let mut buf = [0u8; crate::config::BLOCK_SIZE];

    loop {
        let inst = match Instruction::read(&mut crate::stream::AsRead(diff)) {
            Ok(Some(inst)) => inst,
            Ok(None) | Err(_) => {
                return FileKind::Invalid {
                    reason: "read failed -- file truncated?".to_string(),
                }
            }
        };
        if inst.is_terminator() {
            break;
        }
        total_copied += inst.copy_count as u64;
        total_added += inst.append_count as u64;
        for _ in 0..inst.append_count {
            if !crate::stream::read_exact_or_eof(diff, &mut buf).unwrap_or(false) {
                return FileKind::Invalid {
                    reason: "read failed -- file truncated?".to_string(),
                };
            }
        }
    }

    let (target_digest, source_digest) =
        match crate::format::read_footer_digests(&mut crate::stream::AsRead(diff)) {
            Ok(digests) => digests,
            Err(_) => {
                return FileKind::Invalid {
                    reason: "read failed -- file truncated?".to_string(),
                }
            }
        };

    FileKind::Diff {
        source_digest,
        target_digest,
        copied: total_copied,
        added: total_added,
    }
}

fn parse_data_tail(stream: &mut dyn ByteStream, prefix: &[u8]) -> FileKind {
    let mut digest = RunningDigest::new();
    digest.update(prefix);
    let mut total_bytes = prefix.len() as u64;
    let mut buf = [0u8; crate::config::BLOCK_SIZE];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                digest.update(&buf[..n]);
                total_bytes += n as u64;
            }
        }
    }
    FileKind::Data {
        digest: digest.finalize(),
        total_bytes,
    }
}

/// Marks every diff reachable (transitively, through source/target-digest
/// edges) from a file whose digest is `seed` as usable. Matches
/// `tardiffinfo.c::mark_diffs_usable`'s recursive walk.
fn mark_diffs_usable(files: &mut [IdentifiedFile], seed: &[u8; DIGEST_SIZE]) {
    let mut newly_marked = Vec::new();
    for file in files.iter() {
        if file.usable {
            continue;
        }
        if let FileKind::Diff {
            source_digest,
            target_digest,
            ..
        } = &file.kind
        {
            let matches_seed = source_digest.as_ref() == Some(seed)
                || (source_digest.is_none() && *seed == UNKNOWN_SOURCE_DIGEST);
            if matches_seed {
                newly_marked.push(*target_digest);
            }
        }
    }
    if newly_marked.is_empty() {
        return;
    }
    for file in files.iter_mut() {
        if let FileKind::Diff { source_digest, .. } = &file.kind {
            let matches_seed = source_digest.as_ref() == Some(seed)
                || (source_digest.is_none() && *seed == UNKNOWN_SOURCE_DIGEST);
            if matches_seed {
                file.usable = true;
            }
        }
    }
    for target in newly_marked {
        mark_diffs_usable(files, &target);
    }
}

/// Computes the usability graph over a batch of classified files: every
/// data file is usable by definition and seeds reachability by its digest;
/// every v1.0 diff (no source digest) is seeded reachable too, so it never
/// shows up as gratuitously unusable. Returns `true` iff every file ended
/// up usable (matches `write_usability_report`'s return value).
pub fn compute_usability(files: &mut [IdentifiedFile]) -> bool {
    let seeds: Vec<[u8; DIGEST_SIZE]> = files
        .iter_mut()
        .filter_map(|f| {
            if let FileKind::Data { digest, .. } = &f.kind {
                f.usable = true;
                Some(*digest)
            } else {
                None
            }
        })
        .collect();
    for seed in &seeds {
        mark_diffs_usable(files, seed);
    }
    mark_diffs_usable(files, &UNKNOWN_SOURCE_DIGEST);
    files.iter().all(|f| f.usable)
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
    fn mismatched_prefix_is_classified_as_data() {
        let data = b"hello world, this is definitely not a diff".to_vec();
        let mut stream = SliceStream { data: &data, pos: 0 };
        let result = identify_one("x", &mut stream);
        assert!(matches!(result.kind, FileKind::Data { .. }));
    }

    #[test]
    fn empty_file_is_invalid() {
        let data: Vec<u8> = Vec::new();
        let mut stream = SliceStream { data: &data, pos: 0 };
        let result = identify_one("x", &mut stream);
        assert!(matches!(result.kind, FileKind::Invalid { .. }));
    }

    #[test]
    fn well_formed_diff_is_classified_with_totals() {
        use crate::diff::create_diff;

        let source_data = vec![7u8; 512 * 2];
        let target_data = vec![8u8; 512 * 3];
        let mut source = SliceStream {
            data: &source_data,
            pos: 0,
        };
        let mut target = SliceStream {
            data: &target_data,
            pos: 0,
        };
        let diff_bytes = create_diff(&mut source, &mut target, Vec::new()).unwrap();
        let mut diff_stream = SliceStream {
            data: &diff_bytes,
            pos: 0,
        };
        let result = identify_one("d", &mut diff_stream);
        match result.kind {
            FileKind::Diff {
                added, source_digest, ..
            } => {
                assert_eq!(added, 3);
                assert!(source_digest.is_some());
            }
            other => panic!("expected Diff, got {other:?}"),
        }
    }

    #[test]
    fn data_file_marks_its_diff_usable() {
        let data_digest = [1u8; DIGEST_SIZE];
        let mut files = vec![
            IdentifiedFile {
                path: "f0".into(),
                kind: FileKind::Data { digest: data_digest, total_bytes: 512 },
                usable: false,
            },
            IdentifiedFile {
                path: "d1".into(),
                kind: FileKind::Diff {
                    source_digest: Some(data_digest),
                    target_digest: [2u8; DIGEST_SIZE],
                    copied: 1,
                    added: 0,
                },
                usable: false,
            },
        ];
        let all_usable = compute_usability(&mut files);
        assert!(all_usable);
        assert!(files[1].usable);
    }

    #[test]
    fn unreachable_diff_is_flagged() {
        let mut files = vec![
            IdentifiedFile {
                path: "f0".into(),
                kind: FileKind::Data {
                    digest: [1u8; DIGEST_SIZE],
                    total_bytes: 512,
                },
                usable: false,
            },
            IdentifiedFile {
                path: "d1".into(),
                kind: FileKind::Diff {
                    source_digest: Some([9u8; DIGEST_SIZE]),
                    target_digest: [2u8; DIGEST_SIZE],
                    copied: 1,
                    added: 0,
                },
                usable: false,
            },
        ];
        let all_usable = compute_usability(&mut files);
        assert!(!all_usable);
        assert!(!files[1].usable);
    }

    #[test]
    fn v1_0_diff_is_seeded_reachable() {
        let mut files = vec![IdentifiedFile {
            path: "d0".into(),
            kind: FileKind::Diff {
                source_digest: None,
                target_digest: [5u8; DIGEST_SIZE],
                copied: 0,
                added: 1,
            },
            usable: false,
        }];
        let all_usable = compute_usability(&mut files);
        assert!(all_usable);
    }
}

impl std::fmt::Debug for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Data { .. } => write!(f, "Data"),
            FileKind::Diff { .. } => write!(f, "Diff"),
            FileKind::Invalid { reason } => write!(f, "Invalid({reason})"),
        }
    }
}
