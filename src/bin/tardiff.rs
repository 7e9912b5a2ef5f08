//! Multicall entry point. Rust port of `main.c`: the binary dispatches on
//! its own `argv[0]` basename (`tardiff`, `tarpatch`, `tardiffmerge`,
//! `tardiffinfo`) so that symlinks under any of those names behave like
//! the corresponding original tool.

use std::process::ExitCode;

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().collect();
    ExitCode::from(tardiff::cli::run(&argv) as u8)
}
