//! Calibrated measurement protocol
//!
//! A benchmark produces one [`CpuTime`] sample per repetition block. The
//! samples are folded here, the matching loop overhead is subtracted from the
//! user component, and the total is divided once by the number of primitive
//! calls that were timed.

use serde::{Deserialize, Serialize};

use crate::cpu_time::CpuTime;

/// Timed samples for one benchmark configuration, before averaging
#[derive(Debug, Clone, Default)]
pub struct BlockSamples {
    /// One elapsed sample per completed repetition block
    pub blocks: Vec<CpuTime>,
    /// Loop iterations inside each block's timed region
    pub iterations_per_block: u64,
    /// Primitive calls issued per loop iteration
    pub calls_per_iteration: u64,
    /// Primitive calls that returned an error
    pub failures: u64,
    /// Calls in the nominal count that were never issued, such as the
    /// shrink after a failed grow
    pub skipped_calls: u64,
}

impl BlockSamples {
    pub fn new(iterations_per_block: u64, calls_per_iteration: u64) -> Self {
        Self {
            blocks: Vec::new(),
            iterations_per_block,
            calls_per_iteration,
            failures: 0,
            skipped_calls: 0,
        }
    }

    pub fn push(&mut self, elapsed: CpuTime) {
        self.blocks.push(elapsed);
    }

    /// Total number of primitive calls issued across all completed blocks
    pub fn total_calls(&self) -> u64 {
        (self.blocks.len() as u64 * self.iterations_per_block * self.calls_per_iteration)
            .saturating_sub(self.skipped_calls)
    }

    /// Fold the blocks into a mean per-call cost
    ///
    /// `overhead_user` is the empty-loop user time for
    /// `iterations_per_block` iterations; it is subtracted once per block.
    pub fn mean(&self, overhead_user: f64) -> CpuTime {
        fold_mean(&self.blocks, overhead_user, self.total_calls())
    }
}

/// Mean CPU time per primitive call over a sequence of repetition blocks
///
/// Each block timed `calls_per_block` primitive calls and carries the
/// overhead of one calibrated loop. Negative results are clamped to zero.
/// No blocks, or zero calls per block, yields [`CpuTime::ZERO`].
///
/// # Example
/// ```
/// use primtime::cpu_time::CpuTime;
/// use primtime::measure::mean_per_call;
///
/// let blocks = [CpuTime::new(0.3, 0.2), CpuTime::new(0.3, 0.2)];
/// let mean = mean_per_call(&blocks, 0.1, 100);
/// assert!((mean.user - 0.002).abs() < 1e-12);
/// assert!((mean.system - 0.002).abs() < 1e-12);
/// ```
pub fn mean_per_call(blocks: &[CpuTime], overhead_user: f64, calls_per_block: u64) -> CpuTime {
    fold_mean(blocks, overhead_user, blocks.len() as u64 * calls_per_block)
}

fn fold_mean(blocks: &[CpuTime], overhead_user: f64, total_calls: u64) -> CpuTime {
    if total_calls == 0 {
        return CpuTime::ZERO;
    }

    let mut total: CpuTime = blocks.iter().sum();
    total.user -= overhead_user * blocks.len() as f64;
    total.per(total_calls as f64).clamp_non_negative()
}

/// Mean per-call cost of one primitive under one configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchResult {
    pub label: String,
    #[serde(flatten)]
    pub mean: CpuTime,
    /// Number of primitive calls the mean was taken over
    pub calls: u64,
    /// Calls that failed and were counted as error samples
    #[serde(skip_serializing_if = "is_zero")]
    #[serde(default)]
    pub failures: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl BenchResult {
    pub fn from_samples(label: impl Into<String>, samples: &BlockSamples, overhead_user: f64) -> Self {
        Self {
            label: label.into(),
            mean: samples.mean(overhead_user),
            calls: samples.total_calls(),
            failures: samples.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_subtracts_overhead_per_block() {
        // 10 blocks of 1000 calls, each 2ms user of which 1ms is loop overhead
        let blocks = vec![CpuTime::new(0.002, 0.001); 10];
        let mean = mean_per_call(&blocks, 0.001, 1000);
        assert!((mean.user - 1e-6).abs() < 1e-15);
        assert!((mean.system - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_overhead_not_applied_to_system() {
        let blocks = [CpuTime::new(0.0, 0.5)];
        let mean = mean_per_call(&blocks, 0.25, 1);
        assert_eq!(mean, CpuTime::new(0.0, 0.5));
    }

    #[test]
    fn test_negative_mean_is_clamped() {
        let blocks = [CpuTime::new(0.001, 0.0)];
        let mean = mean_per_call(&blocks, 0.004, 10);
        assert_eq!(mean.user, 0.0);
    }

    #[test]
    fn test_empty_blocks_yield_zero() {
        assert_eq!(mean_per_call(&[], 1.0, 100), CpuTime::ZERO);
    }

    #[test]
    fn test_zero_calls_yield_zero() {
        assert_eq!(mean_per_call(&[CpuTime::new(1.0, 1.0)], 0.0, 0), CpuTime::ZERO);
    }

    #[test]
    fn test_paired_calls_halve_the_mean() {
        let mut samples = BlockSamples::new(100, 2);
        samples.push(CpuTime::new(0.4, 0.2));
        assert_eq!(samples.total_calls(), 200);
        let mean = samples.mean(0.0);
        assert!((mean.user - 0.002).abs() < 1e-15);
        assert!((mean.system - 0.001).abs() < 1e-15);
    }

    #[test]
    fn test_skipped_blocks_shrink_divisor() {
        let mut samples = BlockSamples::new(1000, 1);
        samples.push(CpuTime::new(0.001, 0.0));
        samples.push(CpuTime::new(0.001, 0.0));
        assert_eq!(samples.total_calls(), 2000);
        assert!((samples.mean(0.0).user - 1e-6).abs() < 1e-15);
    }

    #[test]
    fn test_skipped_calls_leave_divisor() {
        // 100 grow/shrink pairs where 40 grows failed: 160 calls issued
        let mut samples = BlockSamples::new(100, 2);
        samples.push(CpuTime::new(0.16, 0.08));
        samples.failures = 40;
        samples.skipped_calls = 40;
        assert_eq!(samples.total_calls(), 160);
        let mean = samples.mean(0.0);
        assert!((mean.user - 0.001).abs() < 1e-15);
        assert!((mean.system - 0.0005).abs() < 1e-15);

        let result = BenchResult::from_samples("sbrk 1b", &samples, 0.0);
        assert_eq!(result.calls, 160);
        assert_eq!(result.failures, 40);
    }

    #[test]
    fn test_result_json_shape() {
        let mut samples = BlockSamples::new(10, 1);
        samples.push(CpuTime::new(0.01, 0.0));
        let result = BenchResult::from_samples("mutex", &samples, 0.0);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "mutex");
        assert_eq!(json["calls"], 10);
        assert!(json.get("user").is_some());
        assert!(json.get("failures").is_none());
    }
}
