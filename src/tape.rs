//! Sequential tape device abstraction.

use std::fs;
use std::io::{self, prelude::*, SeekFrom};
use std::path::Path;
use std::thread;
use std::time::Duration;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

/// Sequential access device interface. A tape holds fixed-width 32-bit signed
/// integers and exposes a single head that advances one element per successful
/// read or write.
///
/// A failed read collapses end-of-data and device faults into one signal:
/// the caller cannot tell an exhausted tape from a broken one.
pub trait Tape {
    /// Reads the element under the head and advances past it.
    /// Returns [`None`] when no element could be read.
    fn read(&mut self) -> Option<i32>;

    /// Writes an element at the head position and advances past it.
    fn write(&mut self, value: i32) -> bool;

    /// Moves the head one element forward or backward.
    fn step(&mut self, forward: bool) -> bool;

    /// Moves the head back to the beginning of the tape.
    fn rewind(&mut self);
}

/// Simulated latency of each tape operation.
/// All timings default to zero, which makes [`FileTape`] behave like a plain file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapeTimings {
    /// Time a single element read takes.
    pub read: Duration,
    /// Time a single element write takes.
    pub write: Duration,
    /// Time a single head step takes.
    pub step: Duration,
    /// Time a full rewind takes.
    pub rewind: Duration,
}

impl TapeTimings {
    /// Creates timings from per-operation latencies given in milliseconds.
    pub fn from_millis(read: u64, write: u64, step: u64, rewind: u64) -> Self {
        TapeTimings {
            read: Duration::from_millis(read),
            write: Duration::from_millis(write),
            step: Duration::from_millis(step),
            rewind: Duration::from_millis(rewind),
        }
    }
}

/// File backed tape. Elements are stored as native-endian 4-byte integers,
/// back to back, with no framing. Every operation blocks for the configured
/// latency before touching the file; a successful read or write additionally
/// pays the step latency, since it advances the head.
pub struct FileTape {
    file: fs::File,
    timings: TapeTimings,
}

impl FileTape {
    /// Opens a tape file, creating it empty if it does not exist.
    /// The head starts at the beginning.
    pub fn new(path: impl AsRef<Path>, timings: TapeTimings) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        return Ok(FileTape { file, timings });
    }

    /// Creates a tape file, truncating any previous contents.
    pub fn create(path: impl AsRef<Path>, timings: TapeTimings) -> io::Result<Self> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        return Ok(FileTape { file, timings });
    }
}

impl Tape for FileTape {
    fn read(&mut self) -> Option<i32> {
        thread::sleep(self.timings.read);
        match self.file.read_i32::<NativeEndian>() {
            Ok(value) => {
                thread::sleep(self.timings.step);
                Some(value)
            }
            Err(_) => None,
        }
    }

    fn write(&mut self, value: i32) -> bool {
        thread::sleep(self.timings.write);
        match self.file.write_i32::<NativeEndian>(value) {
            Ok(()) => {
                thread::sleep(self.timings.step);
                true
            }
            Err(_) => false,
        }
    }

    fn step(&mut self, forward: bool) -> bool {
        thread::sleep(self.timings.step);
        let offset = std::mem::size_of::<i32>() as i64;
        let offset = if forward { offset } else { -offset };
        self.file.seek(SeekFrom::Current(offset)).is_ok()
    }

    fn rewind(&mut self) {
        thread::sleep(self.timings.rewind);
        let _ = self.file.seek(SeekFrom::Start(0));
    }
}

pub mod mem {
    //! In-memory tape used as a fast stand-in for file tapes in tests
    //! and examples.

    use super::Tape;

    /// Tape backed by a plain vector. Reads and writes are immediate.
    #[derive(Debug, Default, Clone)]
    pub struct MemoryTape {
        cells: Vec<i32>,
        pos: usize,
    }

    impl MemoryTape {
        /// Creates an empty tape with the head at the beginning.
        pub fn new() -> Self {
            MemoryTape::default()
        }

        /// Consumes the tape and returns its contents.
        pub fn into_inner(self) -> Vec<i32> {
            self.cells
        }
    }

    impl From<Vec<i32>> for MemoryTape {
        fn from(cells: Vec<i32>) -> Self {
            MemoryTape { cells, pos: 0 }
        }
    }

    impl Tape for MemoryTape {
        fn read(&mut self) -> Option<i32> {
            let value = self.cells.get(self.pos).copied()?;
            self.pos += 1;
            Some(value)
        }

        fn write(&mut self, value: i32) -> bool {
            if self.pos < self.cells.len() {
                self.cells[self.pos] = value;
            } else {
                self.cells.push(value);
            }
            self.pos += 1;
            true
        }

        fn step(&mut self, forward: bool) -> bool {
            if forward {
                if self.pos < self.cells.len() {
                    self.pos += 1;
                    return true;
                }
            } else if self.pos > 0 {
                self.pos -= 1;
                return true;
            }
            false
        }

        fn rewind(&mut self) {
            self.pos = 0;
        }
    }
}
