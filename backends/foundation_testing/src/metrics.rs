//! Latency and throughput figures for stress runs.

use core::fmt;
use core::time::Duration;

/// Summary of a set of latency samples, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub samples: usize,
    pub min: u64,
    pub max: u64,
    pub mean: u64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

impl LatencySummary {
    /// Summarizes `samples`, or `None` when there are none.
    #[must_use]
    pub fn from_samples(mut samples: Vec<u64>) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        let total: u128 = samples.iter().map(|&sample| u128::from(sample)).sum();
        let count = samples.len();
        let mean = u64::try_from(total / count as u128).unwrap_or(u64::MAX);

        Some(Self {
            samples: count,
            min: samples[0],
            max: samples[count - 1],
            mean,
            p50: nearest_rank(&samples, 50),
            p95: nearest_rank(&samples, 95),
            p99: nearest_rank(&samples, 99),
        })
    }
}

// `sorted` is non-empty; nearest-rank percentile.
fn nearest_rank(sorted: &[u64], percent: usize) -> u64 {
    let rank = (sorted.len() * percent).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}

/// Operation count and timing of one stress run.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub operations: usize,
    pub duration: Duration,
    pub latency: Option<LatencySummary>,
}

impl Metrics {
    #[must_use]
    pub fn new(operations: usize, duration: Duration, samples: Vec<u64>) -> Self {
        Self {
            operations,
            duration,
            latency: LatencySummary::from_samples(samples),
        }
    }

    /// Operations per second over the whole run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.operations as f64 / secs
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ops in {:?} ({:.0} ops/s)",
            self.operations,
            self.duration,
            self.throughput()
        )?;
        if let Some(latency) = &self.latency {
            write!(
                f,
                ", latency ns min={} p50={} p95={} p99={} max={}",
                latency.min, latency.p50, latency.p95, latency.p99, latency.max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WHY: A run with no successful operation has nothing to summarize
    /// WHAT: Empty samples produce no summary
    #[test]
    fn test_empty_samples() {
        assert_eq!(LatencySummary::from_samples(vec![]), None);
    }

    /// WHY: Percentiles drive the bench and stress reports
    /// WHAT: Nearest-rank percentiles over 1..=100
    #[test]
    fn test_percentiles() {
        let summary = LatencySummary::from_samples((1..=100).rev().collect()).unwrap();

        assert_eq!(summary.samples, 100);
        assert_eq!(summary.min, 1);
        assert_eq!(summary.max, 100);
        assert_eq!(summary.mean, 50);
        assert_eq!(summary.p50, 50);
        assert_eq!(summary.p95, 95);
        assert_eq!(summary.p99, 99);
    }

    /// WHY: A single sample is every percentile
    /// WHAT: All fields equal the only sample
    #[test]
    fn test_single_sample() {
        let summary = LatencySummary::from_samples(vec![7]).unwrap();
        assert_eq!((summary.min, summary.p50, summary.p99, summary.max), (7, 7, 7, 7));
    }

    #[test]
    fn test_throughput() {
        let metrics = Metrics::new(500, Duration::from_millis(250), vec![]);
        assert!((metrics.throughput() - 2000.0).abs() < f64::EPSILON);
        assert_eq!(Metrics::new(1, Duration::ZERO, vec![]).throughput(), 0.0);
        assert!(metrics.to_string().starts_with("500 ops"));
    }
}
