// config.rs — wire-format constants.
// Migrated from common.h (maksverver/tardiff).
//
// These are format-fixed: changing any of them changes what a `tardiff`
// binary considers a valid differences file, so they are not runtime
// configuration (there is none — see distilled spec §6, "Persisted state:
// none beyond the output files; no configuration").

/// Block size in bytes. Corresponds to `BS` in common.h.
pub const BLOCK_SIZE: usize = 512;

/// MD5 digest size in bytes. Corresponds to `DS` in common.h.
pub const DIGEST_SIZE: usize = 16;

/// Maximum number of blocks a single instruction may copy. Corresponds to
/// `NC` in common.h.
pub const MAX_COPY: u16 = 32767;

/// Maximum number of literal blocks a single instruction may append.
/// Corresponds to `NA` in common.h.
pub const MAX_APPEND: u16 = 2048;

/// 8-byte file signature that opens every differences file. Corresponds to
/// `MAGIC_STR` in common.h.
pub const MAGIC: &[u8; 8] = b"tardiff0";

/// Length of [`MAGIC`] in bytes, for callers that need it as a `usize`
/// (array sizes, short-read comparisons) without hardcoding `8` again.
pub const MAGIC_LEN: usize = MAGIC.len();

/// Sentinel source-block index meaning "no copy pending" / terminator.
pub const NO_SEEK: u32 = 0xFFFF_FFFF;

/// Sentinel copy/append counts that make up the end-of-instructions triple.
pub const TERMINATOR_COUNT: u16 = 0xFFFF;

/// Number of records held in the external sorter's in-memory cache before a
/// run is flushed to a temp file. Corresponds to the `4096` passed to
/// `BinSort_create` in `tardiff.c::tardiff()`.
pub const SORT_CACHE_BLOCKS: usize = 4096;

/// Fan-in of the external sorter's greedy k-way merge: once the trailing
/// `K_WAY` runs are all the same length, they are merged into one. Distilled
/// spec §4.1.
pub const K_WAY: usize = 16;

/// Upper bound on simultaneously open run files (`32 * K_WAY`, distilled
/// spec §4.1).
pub const MAX_OPEN_RUNS: usize = 32 * K_WAY;

/// Maximum copy-run / append-run length the merger packs into one
/// instruction. `tardiffmerge.c` caps both at `0x7fff`, distinct from the
/// diff writer's `MAX_COPY`/`MAX_APPEND` -- kept at `0x7FFF` rather than
/// widened to the reader's `0x7FFE` ceiling (distilled spec §9 open
/// question; see DESIGN.md).
pub const MERGE_MAX_RUN: u16 = 0x7FFF;

/// Largest number of differences files `tardiffmerge` accepts on one
/// command line. Corresponds to `MAX_DIFF_FILES` in `tardiffmerge.c`.
pub const MAX_DIFF_FILES: usize = 100;
