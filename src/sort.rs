//! External tape sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::Path;

use crate::merger::BinaryHeapMerger;
use crate::run::{Run, RunWriter, ELEMENT_SIZE};
use crate::tape::Tape;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Memory or tape budget misconfiguration.
    Config(ConfigError),
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Run file I/O error.
    IO(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::Config(err) => err,
            SortError::TempDir(err) => err,
            SortError::IO(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(err) => write!(f, "invalid sorter configuration: {}", err),
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
        }
    }
}

/// Budget violation detected at construction time, before any I/O occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The tape budget does not allow a single temporary tape.
    TapeLimit,
    /// The memory budget is smaller than a single element.
    MemoryLimit,
    /// A single-element buffer combined with a single temporary tape
    /// cannot reduce the run count and would never terminate.
    NoProgress,
}

impl Error for ConfigError {}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ConfigError::TapeLimit => write!(f, "at least one temporary tape is required"),
            ConfigError::MemoryLimit => write!(f, "memory limit is smaller than a single element"),
            ConfigError::NoProgress => {
                write!(f, "a one-element buffer cannot be merged through a single tape")
            }
        }
    }
}

/// Tape sorter builder. Provides methods for [`TapeSorter`] initialization.
#[derive(Debug, Clone)]
pub struct TapeSorterBuilder {
    /// Working memory budget in bytes. Must be set to at least one element.
    memory_limit: u64,
    /// Number of temporary tapes usable simultaneously.
    tape_limit: usize,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl TapeSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    /// The memory limit defaults to zero and must be set explicitly.
    pub fn new() -> Self {
        TapeSorterBuilder::default()
    }

    /// Builds a [`TapeSorter`] instance using provided configuration.
    pub fn build(self) -> Result<TapeSorter, SortError> {
        TapeSorter::new(
            self.memory_limit,
            self.tape_limit,
            self.tmp_dir.as_deref(),
            self.rw_buf_size,
        )
    }

    /// Sets the working memory budget in bytes.
    pub fn with_memory_limit(mut self, memory_limit: u64) -> TapeSorterBuilder {
        self.memory_limit = memory_limit;
        return self;
    }

    /// Sets the number of temporary tapes usable simultaneously.
    pub fn with_tape_limit(mut self, tape_limit: usize) -> TapeSorterBuilder {
        self.tape_limit = tape_limit;
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> TapeSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> TapeSorterBuilder {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl Default for TapeSorterBuilder {
    fn default() -> Self {
        TapeSorterBuilder {
            memory_limit: 0,
            tape_limit: 3,
            tmp_dir: None,
            rw_buf_size: None,
        }
    }
}

/// External tape sorter.
///
/// Sorts the contents of a sequential input tape onto an output tape using
/// bounded working memory and a bounded number of simultaneously open
/// temporary tapes. Sorting proceeds in passes: the input is first split
/// into memory-sized sorted runs, then runs are merged in groups no larger
/// than the tape budget until a single run remains, which is streamed onto
/// the output tape.
pub struct TapeSorter {
    /// Buffer capacity in elements, derived from the memory budget.
    capacity: usize,
    /// Merge fan-in bound.
    tape_limit: usize,
    /// Directory holding the run files.
    tmp_dir: tempfile::TempDir,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl TapeSorter {
    /// Creates a new tape sorter instance.
    ///
    /// # Arguments
    /// * `memory_limit` - Working memory budget in bytes. The run buffer holds
    ///   at most `memory_limit / 4` elements.
    /// * `tape_limit` - Maximum number of temporary tapes open simultaneously,
    ///   bounding the merge fan-in.
    /// * `tmp_path` - Directory to be used to store temporary data. If the
    ///   parameter is [`None`] the default OS temporary directory will be used.
    /// * `rw_buf_size` - Run file read/write buffer size.
    pub fn new(
        memory_limit: u64,
        tape_limit: usize,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        let capacity = Self::check_limits(memory_limit, tape_limit)?;

        return Ok(TapeSorter {
            capacity,
            tape_limit,
            tmp_dir: Self::init_tmp_directory(tmp_path)?,
            rw_buf_size,
        });
    }

    fn check_limits(memory_limit: u64, tape_limit: usize) -> Result<usize, SortError> {
        if tape_limit < 1 {
            return Err(SortError::Config(ConfigError::TapeLimit));
        }
        if memory_limit < ELEMENT_SIZE {
            return Err(SortError::Config(ConfigError::MemoryLimit));
        }

        let capacity = (memory_limit / ELEMENT_SIZE) as usize;
        if capacity == 1 && tape_limit == 1 {
            return Err(SortError::Config(ConfigError::NoProgress));
        }

        return Ok(capacity);
    }

    fn init_tmp_directory(tmp_path: Option<&Path>) -> Result<tempfile::TempDir, SortError> {
        let tmp_dir = if let Some(tmp_path) = tmp_path {
            tempfile::tempdir_in(tmp_path)
        } else {
            tempfile::tempdir()
        }
        .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", tmp_dir.path().display());

        return Ok(tmp_dir);
    }

    /// Sorts the contents of the input tape onto the output tape.
    /// Both tapes are borrowed for the duration of the call; the output tape
    /// is rewound before returning so its contents can be read back directly.
    ///
    /// # Arguments
    /// * `input` - Tape holding the elements to be sorted, read to exhaustion
    /// * `output` - Tape receiving the sorted sequence
    pub fn sort(&self, input: &mut dyn Tape, output: &mut dyn Tape) -> Result<(), SortError> {
        let mut generation = self.build_runs(input)?;
        let mut pass = 0;

        while generation.len() > 1 {
            let groups = Self::plan_groups(&generation, self.tape_limit);
            log::debug!(
                "merge pass {}: {} runs in {} groups",
                pass,
                generation.len(),
                groups.len()
            );

            let mut next = Vec::with_capacity(groups.len());
            for (group_idx, group) in groups.into_iter().enumerate() {
                next.push(self.merge_group(group, pass, group_idx)?);
            }

            for run in generation {
                run.remove().map_err(|err| SortError::IO(err))?;
            }
            generation = next;
            pass += 1;
        }

        if let Some(run) = generation.pop() {
            log::debug!("writing sorted output ({} elements)", run.len());
            for item in run.reader(self.rw_buf_size).map_err(|err| SortError::IO(err))? {
                output.write(item.map_err(|err| SortError::IO(err))?);
            }
            run.remove().map_err(|err| SortError::IO(err))?;
        }
        output.rewind();

        return Ok(());
    }

    /// Splits the input tape into sorted runs of at most the buffer capacity.
    /// Runs are returned in creation order; a trailing partial buffer still
    /// becomes a run, and an exhausted input yields no runs at all.
    fn build_runs(&self, input: &mut dyn Tape) -> Result<Vec<Run>, SortError> {
        let mut runs = Vec::new();
        let mut buffer = Vec::with_capacity(self.capacity);

        while let Some(value) = input.read() {
            buffer.push(value);
            if buffer.len() >= self.capacity {
                runs.push(self.seal_run(&mut buffer, runs.len())?);
            }
        }
        if !buffer.is_empty() {
            runs.push(self.seal_run(&mut buffer, runs.len())?);
        }

        log::debug!("run generation done ({} runs)", runs.len());

        return Ok(runs);
    }

    /// Sorts the buffered elements and seals them as a run, emptying the buffer.
    fn seal_run(&self, buffer: &mut Vec<i32>, run_idx: usize) -> Result<Run, SortError> {
        log::debug!("sealing run {} ({} elements)", run_idx, buffer.len());
        buffer.sort_unstable();

        let path = self.tmp_dir.path().join(format!("run_{}.bin", run_idx));
        let mut writer = RunWriter::create(path, self.rw_buf_size).map_err(|err| SortError::IO(err))?;
        for value in buffer.drain(..) {
            writer.push(value).map_err(|err| SortError::IO(err))?;
        }

        return writer.seal().map_err(|err| SortError::IO(err));
    }

    /// Partitions a generation into contiguous merge groups no larger than
    /// the tape budget. Only the last group may be shorter.
    fn plan_groups(generation: &[Run], tape_limit: usize) -> Vec<&[Run]> {
        generation.chunks(tape_limit).collect()
    }

    /// Merges a group of sorted runs into a single run, streaming through a
    /// binary heap of at most one element per source. Each source tape is
    /// opened at the start of the call and closed before it returns.
    fn merge_group(&self, group: &[Run], pass: usize, group_idx: usize) -> Result<Run, SortError> {
        let mut sources = Vec::with_capacity(group.len());
        for run in group {
            sources.push(run.reader(self.rw_buf_size).map_err(|err| SortError::IO(err))?);
        }

        let path = self
            .tmp_dir
            .path()
            .join(format!("run_p{}_g{}.bin", pass, group_idx));
        let mut writer = RunWriter::create(path, self.rw_buf_size).map_err(|err| SortError::IO(err))?;

        for item in BinaryHeapMerger::new(sources) {
            let value = item.map_err(|err| SortError::IO(err))?;
            writer.push(value).map_err(|err| SortError::IO(err))?;
        }

        return writer.seal().map_err(|err| SortError::IO(err));
    }
}

#[cfg(test)]
mod test {
    use rand::seq::SliceRandom;
    use rstest::*;

    use super::{ConfigError, SortError, TapeSorter, TapeSorterBuilder};
    use crate::tape::mem::MemoryTape;
    use crate::tape::{FileTape, Tape, TapeTimings};

    const ELEMENT: u64 = std::mem::size_of::<i32>() as u64;

    fn read_all(tape: &mut dyn Tape) -> Vec<i32> {
        let mut values = Vec::new();
        while let Some(value) = tape.read() {
            values.push(value);
        }
        values
    }

    #[rstest]
    #[case::empty(vec![], 4 * ELEMENT, 3)]
    #[case::singleton(vec![42], ELEMENT, 2)]
    #[case::all_equal(vec![7; 10], 4 * ELEMENT, 4)]
    #[case::reversed(Vec::from_iter((1..=10).rev()), 5 * ELEMENT, 3)]
    #[case::one_element_runs(vec![3, 1, 4, 1, 5, 9, 2, 6], ELEMENT, 4)]
    #[case::negatives(vec![-10, 0, 5, -3, 2, -1, 8], 3 * ELEMENT, 3)]
    #[case::already_sorted(Vec::from_iter(1..=8), 3 * ELEMENT, 2)]
    fn test_sort(#[case] input: Vec<i32>, #[case] memory_limit: u64, #[case] tape_limit: usize) {
        let mut expected = input.clone();
        expected.sort_unstable();

        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(memory_limit)
            .with_tape_limit(tape_limit)
            .with_tmp_dir(std::path::Path::new("./"))
            .build()
            .unwrap();

        let mut input_tape = MemoryTape::from(input);
        let mut output_tape = MemoryTape::new();
        sorter.sort(&mut input_tape, &mut output_tape).unwrap();

        assert_eq!(read_all(&mut output_tape), expected);
    }

    #[rstest]
    #[case(8)]
    #[case(100)]
    #[case(1000)]
    fn test_sort_shuffled(#[case] size: i32) {
        let input_sorted = Vec::from_iter(0..size);

        let mut input_shuffled = input_sorted.clone();
        input_shuffled.shuffle(&mut rand::thread_rng());

        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(8 * ELEMENT)
            .with_tape_limit(3)
            .with_tmp_dir(std::path::Path::new("./"))
            .build()
            .unwrap();

        let mut input_tape = MemoryTape::from(input_shuffled);
        let mut output_tape = MemoryTape::new();
        sorter.sort(&mut input_tape, &mut output_tape).unwrap();

        assert_eq!(read_all(&mut output_tape), input_sorted);
    }

    #[rstest]
    fn test_sort_preserves_duplicates() {
        let mut input = Vec::new();
        for value in 0..50 {
            for _ in 0..(value % 4 + 1) {
                input.push(value % 10);
            }
        }
        input.shuffle(&mut rand::thread_rng());

        let mut expected = input.clone();
        expected.sort_unstable();

        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(4 * ELEMENT)
            .with_tape_limit(2)
            .with_tmp_dir(std::path::Path::new("./"))
            .build()
            .unwrap();

        let mut input_tape = MemoryTape::from(input);
        let mut output_tape = MemoryTape::new();
        sorter.sort(&mut input_tape, &mut output_tape).unwrap();

        assert_eq!(read_all(&mut output_tape), expected);
    }

    #[rstest]
    fn test_sort_file_tapes() {
        let tmp_dir = tempfile::tempdir_in("./").unwrap();
        let in_path = tmp_dir.path().join("in.bin");
        let out_path = tmp_dir.path().join("out.bin");

        let mut input_tape = FileTape::new(&in_path, TapeTimings::default()).unwrap();
        for value in [5, -2, 9, 0, -7, 3] {
            assert!(input_tape.write(value));
        }
        input_tape.rewind();

        let mut output_tape = FileTape::create(&out_path, TapeTimings::default()).unwrap();

        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(2 * ELEMENT)
            .with_tape_limit(3)
            .with_tmp_dir(tmp_dir.path())
            .build()
            .unwrap();
        sorter.sort(&mut input_tape, &mut output_tape).unwrap();

        assert_eq!(read_all(&mut output_tape), vec![-7, -2, 0, 3, 5, 9]);
    }

    #[rstest]
    #[case(0, 3, ConfigError::MemoryLimit)]
    #[case(ELEMENT - 1, 3, ConfigError::MemoryLimit)]
    #[case(4 * ELEMENT, 0, ConfigError::TapeLimit)]
    #[case(ELEMENT, 1, ConfigError::NoProgress)]
    fn test_invalid_limits(
        #[case] memory_limit: u64,
        #[case] tape_limit: usize,
        #[case] expected: ConfigError,
    ) {
        let result = TapeSorterBuilder::new()
            .with_memory_limit(memory_limit)
            .with_tape_limit(tape_limit)
            .build();

        match result {
            Err(SortError::Config(err)) => assert_eq!(err, expected),
            _ => panic!("configuration was not rejected"),
        }
    }

    #[rstest]
    #[case(1, 3, 1)]
    #[case(3, 3, 1)]
    #[case(4, 3, 2)]
    #[case(10, 3, 4)]
    #[case(10, 4, 3)]
    fn test_plan_groups(#[case] runs: usize, #[case] tape_limit: usize, #[case] expected_groups: usize) {
        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(ELEMENT)
            .with_tape_limit(tape_limit)
            .with_tmp_dir(std::path::Path::new("./"))
            .build()
            .unwrap();

        let mut input_tape = MemoryTape::from(Vec::from_iter(0..runs as i32));
        let generation = sorter.build_runs(&mut input_tape).unwrap();
        assert_eq!(generation.len(), runs);

        let groups = TapeSorter::plan_groups(&generation, tape_limit);
        assert_eq!(groups.len(), expected_groups);
        assert!(groups.iter().all(|group| group.len() <= tape_limit));
        assert_eq!(groups.iter().map(|group| group.len()).sum::<usize>(), runs);
    }

    #[rstest]
    fn test_build_runs_respects_capacity() {
        let sorter = TapeSorterBuilder::new()
            .with_memory_limit(3 * ELEMENT)
            .with_tape_limit(2)
            .with_tmp_dir(std::path::Path::new("./"))
            .build()
            .unwrap();

        let mut input_tape = MemoryTape::from(Vec::from_iter((0..10).rev()));
        let generation = sorter.build_runs(&mut input_tape).unwrap();

        assert_eq!(generation.len(), 4);
        assert!(generation.iter().all(|run| run.len() <= 3));

        let sorted: Vec<Vec<i32>> = generation
            .iter()
            .map(|run| run.reader(None).unwrap().map(Result::unwrap).collect())
            .collect();
        for run in &sorted {
            assert!(run.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
