//! Run header and host environment
//!
//! The environment block (version, date, CPU) goes to stderr so that stdout
//! carries only the header and the scenario summaries.

use crate::config::RunConfig;
use crate::keys::KEY_SIZE;
use std::io::{self, Write};

/// Processor description taken from `/proc/cpuinfo`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuSummary {
    /// Number of `model name` entries
    pub count: usize,
    /// Last model name seen
    pub model: String,
    /// Last cache size seen
    pub cache: String,
}

/// Extract the processor count, model and cache size from cpuinfo text
pub fn parse_cpuinfo(text: &str) -> CpuSummary {
    let mut summary = CpuSummary::default();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim() {
            "model name" => {
                summary.count += 1;
                summary.model = value.trim().to_string();
            }
            "cache size" => summary.cache = value.trim().to_string(),
            _ => {}
        }
    }
    summary
}

/// Write version, date and (on Linux) CPU details
pub fn print_environment<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "dbbench:    version {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "Date:       {}",
        chrono::Local::now().format("%a %b %e %H:%M:%S %Y")
    )?;

    #[cfg(target_os = "linux")]
    {
        if let Ok(text) = std::fs::read_to_string("/proc/cpuinfo") {
            let cpu = parse_cpuinfo(&text);
            writeln!(out, "CPU:        {} * {}", cpu.count, cpu.model)?;
            writeln!(out, "CPUCache:   {}", cpu.cache)?;
        }
    }
    Ok(())
}

/// Write the key/value geometry of the run and build warnings
pub fn print_header<W: Write>(out: &mut W, config: &RunConfig) -> io::Result<()> {
    let raw_mb =
        ((KEY_SIZE + config.value_size) as f64 * config.num as f64) / 1_048_576.0;
    writeln!(out, "Keys:       {} bytes each", KEY_SIZE)?;
    writeln!(out, "Values:     {} bytes each", config.value_size)?;
    writeln!(out, "Entries:    {}", config.num)?;
    writeln!(out, "RawSize:    {:.1} MB (estimated)", raw_mb)?;
    if cfg!(debug_assertions) {
        writeln!(
            out,
            "WARNING: Optimization is disabled: benchmarks unnecessarily slow"
        )?;
        writeln!(
            out,
            "WARNING: Assertions are enabled; benchmarks unnecessarily slow"
        )?;
    }
    writeln!(out, "{}", "-".repeat(48))
}
