//! Error type for the `tardiff` engine.
//!
//! Mirrors the error-kind taxonomy in distilled spec §7: unreadable input,
//! truncated diff, invalid instruction, invalid block index, digest
//! mismatch, ordering failure, I/O failure. A single enum (rather than one
//! type per component) keeps every core entry point's signature uniform,
//! the way `jafreck-lz4r::frame::types::Lz4FError` collects every LZ4 frame
//! error into one enum with a manual `Display`/`Error` impl.

use std::fmt;
use std::io;

/// Errors produced by the diff/patch/merge/identify engine.
#[derive(Debug)]
pub enum TarDiffError {
    /// A path could not be opened or read.
    UnreadableInput { path: String, source: io::Error },
    /// A diff file ended before an expected field or literal block.
    TruncatedDiff,
    /// An instruction violated a wire-format invariant (`C`/`A` caps, or the
    /// `S == NO_SEEK ⟺ C == 0` consistency rule).
    InvalidInstruction,
    /// A merge instruction referenced a block index past the previous
    /// stage's block count.
    InvalidBlockIndex { index: u32, len: usize },
    /// A patched output's recomputed digest did not match the digest stored
    /// in the differences file.
    DigestMismatch,
    /// A chain of differences files could not be linearised by matching
    /// source/target digests; the caller must supply `-f` pre-ordered input.
    OrderingFailure,
    /// A file's first bytes were not the `tardiff0` magic and it also failed
    /// to parse as a differences file or plain data stream.
    InvalidFile(String),
    /// The source or target file has more than `0xFFFF_FFFE` blocks.
    FileTooLarge,
    /// Any other I/O failure (write, seek, temp-file creation, mmap).
    Io(io::Error),
}

impl fmt::Display for TarDiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TarDiffError::UnreadableInput { path, source } => {
                write!(f, "cannot open \"{path}\" for reading: {source}")
            }
            TarDiffError::TruncatedDiff => write!(f, "read failed -- file truncated?"),
            TarDiffError::InvalidInstruction => write!(f, "invalid diff data"),
            TarDiffError::InvalidBlockIndex { index, len } => write!(
                f,
                "invalid block index in differences file: {index} (previous stage has {len} blocks)"
            ),
            TarDiffError::DigestMismatch => write!(f, "output file verification failed"),
            TarDiffError::OrderingFailure => {
                write!(f, "could not order differences files by digest chain; pass -f to skip ordering")
            }
            TarDiffError::InvalidFile(reason) => write!(f, "{reason}"),
            TarDiffError::FileTooLarge => write!(f, "file too large (more than 2^32 - 2 blocks)"),
            TarDiffError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for TarDiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TarDiffError::UnreadableInput { source, .. } => Some(source),
            TarDiffError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for TarDiffError {
    fn from(e: io::Error) -> Self {
        TarDiffError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, TarDiffError>;
