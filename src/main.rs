//! `db_bench` entry point
//!
//! Exit status is 0 on success and 1 on a flag or store error.

use clap::error::ErrorKind;
use dbbench::cli::{config_from_matches, parse_args};
use dbbench::env::{print_environment, print_header};
use dbbench::{BenchError, Benchmark, RunConfig};
use dbbench_engine::LogStore;
use std::io::{self, Write};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let matches = match parse_args(std::env::args_os()) {
        Ok(matches) => matches,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = e.print();
                process::exit(0);
            }
            _ => {
                eprintln!("Invalid flag: {}", e.to_string().trim_end());
                process::exit(1);
            }
        },
    };

    let config = match config_from_matches(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid flag: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&config) {
        eprintln!("dbbench error: {}", e);
        process::exit(1);
    }
}

fn run(config: &RunConfig) -> Result<(), BenchError> {
    print_environment(&mut io::stderr())?;
    {
        let mut stdout = io::stdout().lock();
        print_header(&mut stdout, config)?;
        stdout.flush()?;
    }

    let mut bench = Benchmark::<LogStore, _>::new(config, io::stdout())?;
    bench.run()?;
    Ok(())
}
