//! `tardiff` — block-granular binary differencing, Rust port of
//! maksverver/tardiff.
//!
//! The crate is organized by pipeline stage rather than by C source file;
//! see each module's doc comment for which original file it replaces.

pub mod config;
pub mod diagnostics;
pub mod digest;
pub mod error;
pub mod format;
pub mod block;
pub mod sort;
pub mod diff;
pub mod patch;
pub mod merge;
pub mod identify;
pub mod stream;
pub mod cli;

pub use error::{Result, TarDiffError};
