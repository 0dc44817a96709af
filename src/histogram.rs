//! Fixed-bucket latency histogram
//!
//! Buckets run 1..10 in steps of one, then per decade at ×1.2, 1.4, 1.6, 1.8,
//! 2, 2.5, 3, 3.5, 4, 4.5, 5, 6, 7, 8, 9, 10 up to 9e9. The last bucket has
//! no upper limit.

use once_cell::sync::Lazy;
use std::fmt;

/// Number of buckets
pub const NUM_BUCKETS: usize = 154;

const DECADE_STEPS: [f64; 16] = [
    1.2, 1.4, 1.6, 1.8, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
];

/// Exclusive upper limit of each bucket
pub static BUCKET_LIMITS: Lazy<[f64; NUM_BUCKETS]> = Lazy::new(|| {
    let mut limits = [0.0; NUM_BUCKETS];
    let mut i = 0;
    for v in 1..=10 {
        limits[i] = v as f64;
        i += 1;
    }
    let mut decade = 10.0;
    while i < NUM_BUCKETS {
        for step in DECADE_STEPS {
            if i == NUM_BUCKETS {
                break;
            }
            limits[i] = decade * step;
            i += 1;
        }
        decade *= 10.0;
    }
    limits[NUM_BUCKETS - 1] = f64::MAX;
    limits
});

/// Latency accumulator in microseconds
#[derive(Debug, Clone)]
pub struct Histogram {
    min: f64,
    max: f64,
    num: f64,
    sum: f64,
    sum_squares: f64,
    buckets: [f64; NUM_BUCKETS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        Self {
            min: BUCKET_LIMITS[NUM_BUCKETS - 1],
            max: 0.0,
            num: 0.0,
            sum: 0.0,
            sum_squares: 0.0,
            buckets: [0.0; NUM_BUCKETS],
        }
    }

    /// Reset to empty
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Record one sample
    pub fn add(&mut self, value: f64) {
        let limits = &*BUCKET_LIMITS;
        let mut b = 0;
        while b < NUM_BUCKETS - 1 && limits[b] <= value {
            b += 1;
        }
        self.buckets[b] += 1.0;
        if self.min > value {
            self.min = value;
        }
        if self.max < value {
            self.max = value;
        }
        self.num += 1.0;
        self.sum += value;
        self.sum_squares += value * value;
    }

    /// Fold another histogram into this one
    pub fn merge(&mut self, other: &Histogram) {
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.num += other.num;
        self.sum += other.sum;
        self.sum_squares += other.sum_squares;
        for (mine, theirs) in self.buckets.iter_mut().zip(other.buckets.iter()) {
            *mine += theirs;
        }
    }

    /// Number of samples
    pub fn count(&self) -> u64 {
        self.num as u64
    }

    /// Smallest sample (0 when empty)
    pub fn min(&self) -> f64 {
        if self.num == 0.0 {
            0.0
        } else {
            self.min
        }
    }

    /// Largest sample
    pub fn max(&self) -> f64 {
        self.max
    }

    /// 50th percentile
    pub fn median(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Interpolated percentile `p` in `[0, 100]`
    pub fn percentile(&self, p: f64) -> f64 {
        let limits = &*BUCKET_LIMITS;
        let threshold = self.num * (p / 100.0);
        let mut sum = 0.0;
        for b in 0..NUM_BUCKETS {
            sum += self.buckets[b];
            if sum >= threshold {
                // Interpolate within the bucket
                let left_point = if b == 0 { 0.0 } else { limits[b - 1] };
                let right_point = limits[b];
                let left_sum = sum - self.buckets[b];
                let right_sum = sum;
                let pos = if right_sum > left_sum {
                    (threshold - left_sum) / (right_sum - left_sum)
                } else {
                    0.0
                };
                let r = left_point + (right_point - left_point) * pos;
                return r.clamp(self.min(), self.max.max(self.min()));
            }
        }
        self.max
    }

    /// Mean sample
    pub fn average(&self) -> f64 {
        if self.num == 0.0 {
            0.0
        } else {
            self.sum / self.num
        }
    }

    /// Population standard deviation
    pub fn standard_deviation(&self) -> f64 {
        if self.num == 0.0 {
            return 0.0;
        }
        let variance =
            (self.sum_squares * self.num - self.sum * self.sum) / (self.num * self.num);
        variance.max(0.0).sqrt()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Count: {:.0}  Average: {:.4}  StdDev: {:.2}",
            self.num,
            self.average(),
            self.standard_deviation()
        )?;
        writeln!(
            f,
            "Min: {:.4}  Median: {:.4}  Max: {:.4}",
            self.min(),
            self.median(),
            self.max
        )?;
        writeln!(f, "{}", "-".repeat(54))?;

        let limits = &*BUCKET_LIMITS;
        let mult = if self.num > 0.0 { 100.0 / self.num } else { 0.0 };
        let mut sum = 0.0;
        for b in 0..NUM_BUCKETS {
            if self.buckets[b] <= 0.0 {
                continue;
            }
            sum += self.buckets[b];
            let left = if b == 0 { 0.0 } else { limits[b - 1] };
            write!(
                f,
                "[ {:7.0}, {:7.0} ) {:7.0} {:7.3}% {:7.3}% ",
                left,
                limits[b],
                self.buckets[b],
                mult * self.buckets[b],
                mult * sum
            )?;

            // 20 marks for 100%
            let marks = (20.0 * (self.buckets[b] / self.num) + 0.5) as usize;
            writeln!(f, "{}", "#".repeat(marks))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_limits_shape() {
        let limits = &*BUCKET_LIMITS;
        assert_eq!(&limits[..12], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 14.0]);
        assert_eq!(limits[25], 100.0);
        assert_eq!(limits[NUM_BUCKETS - 2], 9e9);
        assert_eq!(limits[NUM_BUCKETS - 1], f64::MAX);
        assert!(limits.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_empty_histogram() {
        let hist = Histogram::new();
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.average(), 0.0);
        assert_eq!(hist.standard_deviation(), 0.0);
        assert_eq!(hist.min(), 0.0);
        assert!(hist.to_string().starts_with("Count: 0"));
    }

    #[test]
    fn test_basic_statistics() {
        let mut hist = Histogram::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            hist.add(v);
        }
        assert_eq!(hist.count(), 4);
        assert_eq!(hist.min(), 1.0);
        assert_eq!(hist.max(), 4.0);
        assert_eq!(hist.average(), 2.5);
        assert!((hist.standard_deviation() - 1.118_033_988).abs() < 1e-6);
    }

    #[test]
    fn test_value_lands_in_bucket_above_its_limit() {
        let mut hist = Histogram::new();
        hist.add(10.0);
        // [10, 12) bucket
        assert_eq!(hist.buckets[10], 1.0);
        hist.add(0.5);
        assert_eq!(hist.buckets[0], 1.0);
        hist.add(1e12);
        assert_eq!(hist.buckets[NUM_BUCKETS - 1], 1.0);
    }

    #[test]
    fn test_percentile_within_range() {
        let mut hist = Histogram::new();
        for v in 1..=100 {
            hist.add(v as f64);
        }
        let median = hist.median();
        assert!((45.0..=55.0).contains(&median), "median {}", median);
        assert!(hist.percentile(99.0) <= hist.max());
        assert!(hist.percentile(0.0) >= hist.min());
    }

    #[test]
    fn test_clear_resets() {
        let mut hist = Histogram::new();
        hist.add(5.0);
        hist.clear();
        assert_eq!(hist.count(), 0);
        assert_eq!(hist.max(), 0.0);
    }

    #[test]
    fn test_merge_combines() {
        let mut a = Histogram::new();
        let mut b = Histogram::new();
        a.add(1.0);
        b.add(100.0);
        b.add(50.0);
        a.merge(&b);
        assert_eq!(a.count(), 3);
        assert_eq!(a.min(), 1.0);
        assert_eq!(a.max(), 100.0);
    }

    #[test]
    fn test_display_lists_occupied_buckets() {
        let mut hist = Histogram::new();
        hist.add(3.5);
        hist.add(3.7);
        let text = hist.to_string();
        assert!(text.contains("Count: 2"));
        assert!(text.contains("[       3,       4 )       2 100.000% 100.000% ####################"));
        assert_eq!(text.lines().count(), 4);
    }
}
