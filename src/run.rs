//! Sorted runs materialized on auxiliary storage.

use std::fs;
use std::io::{self, prelude::*};
use std::path::PathBuf;

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};

/// Size of a single tape element on disk.
pub(crate) const ELEMENT_SIZE: u64 = std::mem::size_of::<i32>() as u64;

/// A sealed sorted run. Elements are stored as native-endian 4-byte integers
/// with no framing; the length is implicit in the file size. A run is
/// immutable once sealed and is read through [`Run::reader`].
pub struct Run {
    path: PathBuf,
    len: u64,
}

impl Run {
    /// Returns the number of elements in the run.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Checks if the run holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Opens a fresh read cursor positioned at the start of the run.
    ///
    /// # Arguments
    /// * `buf_size` - Read buffer size. If the parameter is [`None`] the default
    ///   buffer size is used.
    pub fn reader(&self, buf_size: Option<usize>) -> io::Result<RunReader> {
        let file = fs::File::open(&self.path)?;
        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(RunReader {
            reader: reader.take(self.len * ELEMENT_SIZE),
        });
    }

    /// Consumes the run and removes its backing file.
    pub fn remove(self) -> io::Result<()> {
        fs::remove_file(&self.path)
    }
}

/// Write handle for a run under construction. Elements must be pushed in
/// non-decreasing order; [`RunWriter::seal`] flushes them and produces the
/// immutable [`Run`].
pub struct RunWriter {
    writer: io::BufWriter<fs::File>,
    path: PathBuf,
    len: u64,
}

impl RunWriter {
    /// Creates a run file at the given path.
    ///
    /// # Arguments
    /// * `path` - Location of the run file on auxiliary storage.
    /// * `buf_size` - Write buffer size. If the parameter is [`None`] the default
    ///   buffer size is used.
    pub fn create(path: PathBuf, buf_size: Option<usize>) -> io::Result<Self> {
        let file = fs::File::create(&path)?;
        let writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        return Ok(RunWriter { writer, path, len: 0 });
    }

    /// Appends an element to the run.
    pub fn push(&mut self, value: i32) -> io::Result<()> {
        self.writer.write_i32::<NativeEndian>(value)?;
        self.len += 1;
        Ok(())
    }

    /// Flushes pending writes and seals the run.
    pub fn seal(mut self) -> io::Result<Run> {
        self.writer.flush()?;

        return Ok(Run {
            path: self.path,
            len: self.len,
        });
    }
}

/// Forward-only cursor over a sealed run.
pub struct RunReader {
    reader: io::Take<io::BufReader<fs::File>>,
}

impl Iterator for RunReader {
    type Item = io::Result<i32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.limit() == 0 {
            None
        } else {
            match self.reader.read_i32::<NativeEndian>() {
                Ok(value) => Some(Ok(value)),
                Err(err) => Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use rstest::*;

    use super::RunWriter;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir_in("./").unwrap()
    }

    #[rstest]
    fn test_run_roundtrip(tmp_dir: tempfile::TempDir) {
        let saved = Vec::from_iter(-50..50);

        let mut writer = RunWriter::create(tmp_dir.path().join("run_0.bin"), None).unwrap();
        for value in saved.iter() {
            writer.push(*value).unwrap();
        }
        let run = writer.seal().unwrap();
        assert_eq!(run.len(), 100);

        let restored: io::Result<Vec<i32>> = run.reader(None).unwrap().collect();
        assert_eq!(restored.unwrap(), saved);
    }

    #[rstest]
    fn test_empty_run(tmp_dir: tempfile::TempDir) {
        let writer = RunWriter::create(tmp_dir.path().join("run_0.bin"), None).unwrap();
        let run = writer.seal().unwrap();

        assert!(run.is_empty());
        assert_eq!(run.reader(None).unwrap().count(), 0);
    }

    #[rstest]
    fn test_run_removal(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("run_0.bin");

        let mut writer = RunWriter::create(path.clone(), None).unwrap();
        writer.push(1).unwrap();
        let run = writer.seal().unwrap();

        assert!(path.exists());
        run.remove().unwrap();
        assert!(!path.exists());
    }

    #[rstest]
    fn test_reread_starts_at_front(tmp_dir: tempfile::TempDir) {
        let mut writer = RunWriter::create(tmp_dir.path().join("run_0.bin"), None).unwrap();
        for value in [1, 2, 3] {
            writer.push(value).unwrap();
        }
        let run = writer.seal().unwrap();

        for _ in 0..2 {
            let restored: io::Result<Vec<i32>> = run.reader(None).unwrap().collect();
            assert_eq!(restored.unwrap(), vec![1, 2, 3]);
        }
    }
}
