use std::path;

use env_logger;
use log;

use tape_sort::{MemoryTape, Tape, TapeSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let mut input = MemoryTape::from(vec![9, -4, 17, 0, 3, -11, 8, 2, 5, -1]);
    let mut output = MemoryTape::new();

    let sorter = TapeSorterBuilder::new()
        .with_memory_limit(16)
        .with_tape_limit(3)
        .with_tmp_dir(path::Path::new("./"))
        .build()
        .unwrap();

    sorter.sort(&mut input, &mut output).unwrap();

    while let Some(value) = output.read() {
        println!("{}", value);
    }
}
