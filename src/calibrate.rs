//! Empty-loop overhead calibration
//!
//! Every timed region in the suite is a counted loop around one primitive
//! call. The loop's own bookkeeping is measured here with the same iteration
//! count and subtracted from the user time of the real measurement.

use std::hint::black_box;

use crate::cpu_time::CpuTime;
use crate::error::Result;

/// User CPU seconds spent running an empty loop `n` times
///
/// The counter goes through `black_box` so the optimizer cannot remove the
/// loop. System time of an empty loop is negligible and not reported.
///
/// # Example
/// ```
/// use primtime::calibrate::loop_overhead;
///
/// let overhead = loop_overhead(1_000).unwrap();
/// assert!(overhead >= 0.0);
/// ```
pub fn loop_overhead(n: u64) -> Result<f64> {
    let elapsed = CpuTime::measure(|| {
        for i in 0..n {
            black_box(i);
        }
    })?;
    Ok(elapsed.user)
}
