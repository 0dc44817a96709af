//! Command-line surface of `db_bench`
//!
//! Flags use db_bench naming (`--value_size`, `--use_existing_db=1`, ...).
//! Boolean flags take `0` or `1`.

use crate::config::{RunConfig, DEFAULT_BENCHMARKS};
use crate::error::{BenchError, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use dbbench_core::DurabilityMode;
use std::ffi::OsString;
use std::path::PathBuf;

fn toggle(name: &'static str, help: &'static str, default: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_name("0|1")
        .help(help)
        .default_value(default)
        .value_parser(value_parser!(u8).range(0..=1))
}

/// Build the `db_bench` command
pub fn build_cli() -> Command {
    Command::new("db_bench")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Throughput and latency benchmarks for a transactional key-value store")
        .arg(
            Arg::new("benchmarks")
                .long("benchmarks")
                .value_name("LIST")
                .help("Comma-separated list of scenarios to run in order")
                .default_value(DEFAULT_BENCHMARKS),
        )
        .arg(
            Arg::new("num")
                .long("num")
                .help("Number of key/values to place in the store")
                .default_value("1000000")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("reads")
                .long("reads")
                .help("Number of read operations; negative means --num")
                .default_value("-1")
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("value_size")
                .long("value_size")
                .help("Size of each value in bytes (at most 64 MiB less 1 KiB)")
                .default_value("100")
                .value_parser(value_parser!(usize)),
        )
        .arg(toggle(
            "histogram",
            "Print a latency histogram after each scenario",
            "0",
        ))
        .arg(
            Arg::new("compression_ratio")
                .long("compression_ratio")
                .help("Fraction of its original size a value shrinks to under compression")
                .default_value("0.5")
                .value_parser(value_parser!(f64)),
        )
        .arg(toggle(
            "use_existing_db",
            "Reuse the existing store; fresh-store scenarios are skipped",
            "0",
        ))
        .arg(
            Arg::new("page_size")
                .long("page_size")
                .help("Store page size in bytes")
                .default_value("4096")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("num_pages")
                .long("num_pages")
                .help("Cache size in pages")
                .default_value("1024")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .help("Directory for benchmark stores (default: <temp>/dbbench)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("checkpoint_pages")
                .long("checkpoint_pages")
                .help("Pages of written payload between harness checkpoints")
                .default_value("8")
                .value_parser(value_parser!(u64)),
        )
        .arg(toggle("progress", "Print progress lines to stderr", "1"))
        .arg(toggle(
            "sync",
            "Open the initial store with full durability",
            "0",
        ))
}

/// Parse `args` (program name first)
pub fn parse_args<I, T>(args: I) -> std::result::Result<ArgMatches, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    build_cli().try_get_matches_from(args)
}

fn flag(matches: &ArgMatches, name: &str) -> bool {
    matches.get_one::<u8>(name).copied().unwrap_or(0) == 1
}

/// Turn parsed flags into a validated [`RunConfig`]
pub fn config_from_matches(matches: &ArgMatches) -> Result<RunConfig> {
    let defaults = RunConfig::default();
    let missing = |name: &str| BenchError::config(format!("missing value for --{}", name));

    let config = RunConfig {
        benchmarks: matches
            .get_one::<String>("benchmarks")
            .cloned()
            .ok_or_else(|| missing("benchmarks"))?,
        num: *matches.get_one::<u64>("num").ok_or_else(|| missing("num"))?,
        reads: matches
            .get_one::<i64>("reads")
            .and_then(|&n| u64::try_from(n).ok()),
        value_size: *matches
            .get_one::<usize>("value_size")
            .ok_or_else(|| missing("value_size"))?,
        histogram: flag(matches, "histogram"),
        compression_ratio: *matches
            .get_one::<f64>("compression_ratio")
            .ok_or_else(|| missing("compression_ratio"))?,
        use_existing_db: flag(matches, "use_existing_db"),
        page_size: *matches
            .get_one::<usize>("page_size")
            .ok_or_else(|| missing("page_size"))?,
        num_pages: *matches
            .get_one::<usize>("num_pages")
            .ok_or_else(|| missing("num_pages"))?,
        durability: DurabilityMode::from_sync(flag(matches, "sync")),
        db: matches
            .get_one::<PathBuf>("db")
            .cloned()
            .unwrap_or(defaults.db),
        checkpoint_pages: *matches
            .get_one::<u64>("checkpoint_pages")
            .ok_or_else(|| missing("checkpoint_pages"))?,
        progress: flag(matches, "progress"),
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<RunConfig> {
        let mut argv = vec!["db_bench"];
        argv.extend_from_slice(args);
        let matches = parse_args(argv).map_err(|e| BenchError::config(e.to_string()))?;
        config_from_matches(&matches)
    }

    #[test]
    fn test_defaults_match_run_config() {
        let config = parse(&[]).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_db_bench_style_flags() {
        let config = parse(&[
            "--benchmarks=fillseq,readrandom",
            "--num=5000",
            "--reads=200",
            "--value_size=64",
            "--histogram=1",
            "--compression_ratio=0.25",
            "--use_existing_db=1",
            "--page_size=8192",
            "--num_pages=16",
            "--db=/tmp/bench-here",
            "--checkpoint_pages=4",
            "--progress=0",
            "--sync=1",
        ])
        .unwrap();

        assert_eq!(config.benchmarks, "fillseq,readrandom");
        assert_eq!(config.num, 5000);
        assert_eq!(config.read_count(), 200);
        assert_eq!(config.value_size, 64);
        assert!(config.histogram);
        assert_eq!(config.compression_ratio, 0.25);
        assert!(config.use_existing_db);
        assert_eq!(config.page_size, 8192);
        assert_eq!(config.num_pages, 16);
        assert_eq!(config.db, PathBuf::from("/tmp/bench-here"));
        assert_eq!(config.checkpoint_pages, 4);
        assert!(!config.progress);
        assert_eq!(config.durability, DurabilityMode::Full);
    }

    #[test]
    fn test_negative_reads_use_num() {
        let config = parse(&["--num=300", "--reads=-5"]).unwrap();
        assert_eq!(config.reads, None);
        assert_eq!(config.read_count(), 300);
    }

    #[test]
    fn test_rejects_malformed_flags() {
        assert!(parse(&["--histogram=2"]).is_err());
        assert!(parse(&["--num=many"]).is_err());
        assert!(parse(&["--no_such_flag=1"]).is_err());
        assert!(parse(&["--page_size=1000"]).is_err());
        assert!(parse(&["--compression_ratio=-1"]).is_err());
        assert!(parse(&["--value_size=70000000"]).is_err());
    }

    #[test]
    fn test_help_is_not_a_config() {
        let err = parse_args(["db_bench", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
