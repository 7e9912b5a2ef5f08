//! Diff generation: the writer, the source lookup index, and end-to-end
//! orchestration. Rust port of `tardiff.c`.

mod generate;
mod index;
mod writer;

pub use generate::create_diff;
pub use index::SourceIndex;
pub use writer::DiffWriter;
