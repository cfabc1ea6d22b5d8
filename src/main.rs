use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use tape_sort::{FileTape, TapeSorterBuilder, TapeTimings};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let memory = arg_parser.value_of("memory").expect("value is required");
    let memory = memory.parse::<ByteSize>().expect("value is pre-validated").as_u64();
    let tapes: usize = arg_parser.value_of_t_or_exit("tapes");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");

    let timings = TapeTimings::from_millis(
        arg_parser.value_of_t_or_exit("read_latency"),
        arg_parser.value_of_t_or_exit("write_latency"),
        arg_parser.value_of_t_or_exit("step_latency"),
        arg_parser.value_of_t_or_exit("rewind_latency"),
    );

    let input = arg_parser.value_of("input").expect("value is required");
    let mut input_tape = match FileTape::new(input, timings) {
        Ok(tape) => tape,
        Err(err) => {
            log::error!("input tape opening error: {}", err);
            process::exit(1);
        }
    };

    let output = arg_parser.value_of("output").expect("value is required");
    let mut output_tape = match FileTape::create(output, timings) {
        Ok(tape) => tape,
        Err(err) => {
            log::error!("output tape creation error: {}", err);
            process::exit(1);
        }
    };

    let mut sorter_builder = TapeSorterBuilder::new()
        .with_memory_limit(memory)
        .with_tape_limit(tapes);

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = sorter.sort(&mut input_tape, &mut output_tape) {
        log::error!("tape sorting error: {}", err);
        process::exit(1);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("tape-sort")
        .about("external tape sorter")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("tape file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result tape file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("memory")
                .short('m')
                .long("memory")
                .help("working memory budget")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Memory budget format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("tapes")
                .short('t')
                .long("tapes")
                .help("number of temporary tapes usable simultaneously")
                .takes_value(true)
                .default_value("3")
                .validator(|v| match v.parse::<usize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Tape count format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(latency_arg("read_latency", "read-latency", "simulated read latency, ms"))
        .arg(latency_arg("write_latency", "write-latency", "simulated write latency, ms"))
        .arg(latency_arg("step_latency", "step-latency", "simulated step latency, ms"))
        .arg(latency_arg(
            "rewind_latency",
            "rewind-latency",
            "simulated rewind latency, ms",
        ))
        .get_matches()
}

fn latency_arg(name: &'static str, long: &'static str, help: &'static str) -> clap::Arg<'static> {
    clap::Arg::new(name)
        .long(long)
        .help(help)
        .takes_value(true)
        .default_value("0")
        .validator(|v| match v.parse::<u64>() {
            Ok(_) => Ok(()),
            Err(err) => Err(format!("Latency format incorrect: {}", err)),
        })
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
