//! External, disk-backed merge sort. Rust counterpart of `binsort.c`/
//! `binsort.h`.

mod record;
mod sorter;

pub use record::{CopyRecord, SortRecord, SourceRecord};
pub use sorter::{ExternalSorter, SortedTable};
