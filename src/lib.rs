//! `tape-sort` is a rust external merge sort implementation for sequential tape devices.
//!
//! A tape permits only sequential access: elements are read and written one at a time under
//! a head that steps along the medium, and repositioning costs time. Sorting data that lives
//! on such a device therefore cannot rely on random access. Instead the input is split into
//! runs that fit in working memory, each run is sorted in memory and written to temporary
//! storage, and the runs are then merged in passes until a single sorted run remains, bounded
//! at every step by the number of tape drives that may be open simultaneously. For more
//! information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! `tape-sort` supports the following features:
//!
//! * **Device agnostic:**
//!   any type implementing the [`Tape`] capability can serve as input or output; a
//!   latency-simulating file tape and a fast in-memory tape are provided.
//! * **Bounded working memory:**
//!   the run buffer never holds more elements than the configured memory budget allows.
//! * **Bounded merge fan-in:**
//!   no merge opens more temporary tapes than the configured tape budget.
//!
//! # Example
//!
//! ```no_run
//! use std::path;
//!
//! use tape_sort::{FileTape, TapeSorterBuilder, TapeTimings};
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let mut input = FileTape::new("input.bin", TapeTimings::default()).unwrap();
//!     let mut output = FileTape::create("output.bin", TapeTimings::default()).unwrap();
//!
//!     let sorter = TapeSorterBuilder::new()
//!         .with_memory_limit(50 * 1024 * 1024)
//!         .with_tape_limit(4)
//!         .with_tmp_dir(path::Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     sorter.sort(&mut input, &mut output).unwrap();
//! }
//! ```

pub mod merger;
pub mod run;
pub mod sort;
pub mod tape;

pub use merger::BinaryHeapMerger;
pub use run::{Run, RunReader, RunWriter};
pub use sort::{ConfigError, SortError, TapeSorter, TapeSorterBuilder};
pub use tape::{mem::MemoryTape, FileTape, Tape, TapeTimings};
