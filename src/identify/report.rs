//! One-line human-readable summaries for the `info` report, matching
//! `identify.c::process_diff`/`process_data`'s `fprintf` format strings.

use crate::config::DIGEST_SIZE;

fn hexstring(digest: &[u8; DIGEST_SIZE]) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// `"<digest> (<n> blocks)"`, matching `process_data`'s report line.
/// `total_bytes` is the file's full (unpadded) length.
pub fn format_data_line(digest: &[u8; DIGEST_SIZE], total_bytes: u64) -> String {
    let blocks = total_bytes / 512 + u64::from(total_bytes % 512 != 0);
    format!("{} ({} blocks)", hexstring(digest), blocks)
}

/// `"<src> -> <tgt> (<n> blocks, <p>% new)"`, matching `process_diff`'s
/// report line. `src` is `"?"` for a v1.0 diff with no source digest.
pub fn format_diff_line(
    source_digest: Option<&[u8; DIGEST_SIZE]>,
    target_digest: &[u8; DIGEST_SIZE],
    copied: u64,
    added: u64,
) -> String {
    let src = match source_digest {
        Some(d) => hexstring(d),
        None => "?".to_string(),
    };
    let total = copied + added;
    let pct_new = if total == 0 {
        0.0
    } else {
        100.0 * added as f64 / total as f64
    };
    format!(
        "{} -> {} ({} blocks, {:.3}% new)",
        src,
        hexstring(target_digest),
        total,
        pct_new
    )
}
