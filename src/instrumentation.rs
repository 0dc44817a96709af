//! Per-scenario timing, progress reporting and throughput
//!
//! One [`Instrumentation`] value lives for the whole run and is reset by
//! [`Instrumentation::start`] at the beginning of every scenario:
//!
//! - Wall time from `start` to `stop`
//! - Operation count, with progress lines on an adaptive schedule
//! - Bytes moved, used for the MB/s figure
//! - Optional per-operation latency histogram

use crate::histogram::Histogram;
use std::fmt;
use std::time::Instant;

/// Operations slower than this print a warning (histogram mode only)
pub const LONG_OP_MICROS: f64 = 20_000.0;

/// First progress threshold after `start`
pub const FIRST_REPORT: u64 = 100;

/// Next progress threshold after reporting at `current`
///
/// The step grows with the run so reporting stays cheap.
pub fn next_report_threshold(current: u64) -> u64 {
    let step = match current {
        n if n < 1_000 => 100,
        n if n < 5_000 => 500,
        n if n < 10_000 => 1_000,
        n if n < 50_000 => 5_000,
        n if n < 100_000 => 10_000,
        n if n < 500_000 => 50_000,
        _ => 100_000,
    };
    current + step
}

/// Scenario-scoped counters and timers
#[derive(Debug)]
pub struct Instrumentation {
    histogram_enabled: bool,
    progress: bool,
    start: Instant,
    last_op_finish: Instant,
    done: u64,
    next_report: u64,
    bytes: u64,
    message: String,
    hist: Histogram,
}

impl Instrumentation {
    /// Create instrumentation; call [`start`](Self::start) before each scenario
    pub fn new(histogram_enabled: bool, progress: bool) -> Self {
        let now = Instant::now();
        Self {
            histogram_enabled,
            progress,
            start: now,
            last_op_finish: now,
            done: 0,
            next_report: FIRST_REPORT,
            bytes: 0,
            message: String::new(),
            hist: Histogram::new(),
        }
    }

    /// Reset every counter and start the clock
    pub fn start(&mut self) {
        self.start = Instant::now();
        self.last_op_finish = self.start;
        self.done = 0;
        self.next_report = FIRST_REPORT;
        self.bytes = 0;
        self.message.clear();
        self.hist.clear();
    }

    fn is_long_op(&self, micros: f64) -> bool {
        self.histogram_enabled && micros > LONG_OP_MICROS
    }

    /// Record completion of one operation
    pub fn finished_single_op(&mut self) {
        if self.histogram_enabled {
            let now = Instant::now();
            let micros = now.duration_since(self.last_op_finish).as_secs_f64() * 1e6;
            self.hist.add(micros);
            if self.is_long_op(micros) {
                eprint!("long op: {:.1} micros{:30}\r", micros, "");
            }
            self.last_op_finish = now;
        }

        self.done += 1;
        if self.done >= self.next_report {
            self.next_report = next_report_threshold(self.next_report);
            if self.progress {
                eprint!("... finished {} ops{:30}\r", self.done, "");
            }
        }
    }

    /// Count `n` bytes toward the throughput figure
    pub fn add_bytes(&mut self, n: u64) {
        self.bytes += n;
    }

    /// Attach a scenario-specific note to the summary line
    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
    }

    /// Operations completed since `start`
    pub fn done(&self) -> u64 {
        self.done
    }

    /// Bytes recorded since `start`
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Progress threshold that will trigger the next report
    pub fn next_report(&self) -> u64 {
        self.next_report
    }

    /// Finish the scenario and build its summary
    pub fn stop(&mut self, name: &str) -> ScenarioReport {
        let elapsed_secs = self.start.elapsed().as_secs_f64();
        let done = self.done.max(1);

        let mut message = std::mem::take(&mut self.message);
        if self.bytes > 0 {
            let rate = format!(
                "{:6.1} MB/s",
                (self.bytes as f64 / 1_048_576.0) / elapsed_secs.max(f64::MIN_POSITIVE)
            );
            message = if message.is_empty() {
                rate
            } else {
                format!("{} {}", rate, message)
            };
        }

        ScenarioReport {
            name: name.to_string(),
            ops: self.done,
            bytes: self.bytes,
            elapsed_secs,
            micros_per_op: elapsed_secs * 1e6 / done as f64,
            message,
            histogram: self.histogram_enabled.then(|| self.hist.clone()),
        }
    }
}

/// Summary of one finished scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario name as given on the command line
    pub name: String,
    /// Operations completed
    pub ops: u64,
    /// Bytes written or read
    pub bytes: u64,
    /// Wall time in seconds
    pub elapsed_secs: f64,
    /// Average latency
    pub micros_per_op: f64,
    /// Throughput and scenario notes; empty when there is nothing to add
    pub message: String,
    /// Latency distribution, when histograms are enabled
    pub histogram: Option<Histogram>,
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} : {:>11.3} micros/op;{}{}",
            self.name,
            self.micros_per_op,
            if self.message.is_empty() { "" } else { " " },
            self.message
        )?;
        if let Some(hist) = &self.histogram {
            writeln!(f, "Microseconds per op:\n{}", hist)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_schedule() {
        let mut thresholds = vec![FIRST_REPORT];
        while thresholds.len() < 60 {
            let last = *thresholds.last().unwrap();
            thresholds.push(next_report_threshold(last));
        }

        let expected: Vec<u64> = (1..=10)
            .map(|i| i * 100)
            .chain((3..=10).map(|i| i * 500))
            .chain((6..=10).map(|i| i * 1_000))
            .chain((3..=10).map(|i| i * 5_000))
            .chain((6..=10).map(|i| i * 10_000))
            .chain((3..=10).map(|i| i * 50_000))
            .chain((6..=21).map(|i| i * 100_000))
            .collect();
        assert_eq!(thresholds, expected);
    }

    #[test]
    fn test_long_op_warning_follows_histogram_flag() {
        let quiet = Instrumentation::new(true, false);
        assert!(quiet.is_long_op(25_000.0));
        assert!(!quiet.is_long_op(LONG_OP_MICROS));

        let plain = Instrumentation::new(false, true);
        assert!(!plain.is_long_op(25_000.0));
    }

    #[test]
    fn test_threshold_advances_as_ops_finish() {
        let mut inst = Instrumentation::new(false, false);
        inst.start();
        for _ in 0..1_000 {
            inst.finished_single_op();
        }
        assert_eq!(inst.done(), 1_000);
        assert_eq!(inst.next_report(), 1_500);
    }

    #[test]
    fn test_start_resets_state() {
        let mut inst = Instrumentation::new(true, false);
        inst.start();
        inst.add_bytes(500);
        inst.set_message("note");
        inst.finished_single_op();
        inst.start();
        assert_eq!(inst.done(), 0);
        assert_eq!(inst.bytes(), 0);
        assert_eq!(inst.next_report(), FIRST_REPORT);
        let report = inst.stop("x");
        assert!(report.message.is_empty());
        assert_eq!(report.histogram.map(|h| h.count()), Some(0));
    }

    #[test]
    fn test_stop_prepends_rate_to_message() {
        let mut inst = Instrumentation::new(false, false);
        inst.start();
        inst.add_bytes(1 << 20);
        inst.set_message("(10 ops)");
        inst.finished_single_op();
        let report = inst.stop("fillseq");
        assert!(report.message.ends_with("MB/s (10 ops)"), "{}", report.message);
        assert_eq!(report.ops, 1);
        assert!(report.histogram.is_none());
    }

    #[test]
    fn test_stop_without_ops_divides_by_one() {
        let mut inst = Instrumentation::new(false, false);
        inst.start();
        let report = inst.stop("noop");
        assert_eq!(report.ops, 0);
        assert!((report.micros_per_op - report.elapsed_secs * 1e6).abs() < 1e-6);
        assert!(report.message.is_empty());
    }

    #[test]
    fn test_histogram_counts_every_op() {
        let mut inst = Instrumentation::new(true, false);
        inst.start();
        for _ in 0..250 {
            inst.finished_single_op();
        }
        let report = inst.stop("readrandom");
        assert_eq!(report.histogram.map(|h| h.count()), Some(250));
    }

    #[test]
    fn test_report_display() {
        let report = ScenarioReport {
            name: "readseq".into(),
            ops: 10,
            bytes: 0,
            elapsed_secs: 0.001,
            micros_per_op: 1.5,
            message: String::new(),
            histogram: None,
        };
        assert_eq!(report.to_string(), "readseq      :       1.500 micros/op;\n");

        let report = ScenarioReport {
            message: "  12.3 MB/s".into(),
            ..report
        };
        assert_eq!(
            report.to_string(),
            "readseq      :       1.500 micros/op;   12.3 MB/s\n"
        );
    }
}
