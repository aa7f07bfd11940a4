//! Heap growth cost via sbrk(2)
//!
//! Each iteration grows the data segment by `size` bytes and immediately
//! shrinks it back, so the break is unchanged between iterations. Nothing
//! may allocate between the paired calls, which holds because the timed
//! loop makes no other calls.

use tracing::{debug, warn};

use crate::calibrate::loop_overhead;
use crate::cpu_time::CpuTime;
use crate::error::{BenchError, Result};
use crate::measure::{BenchResult, BlockSamples};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Width the size labels are right-aligned to
const LABEL_WIDTH: usize = 7;

fn sbrk_failed(p: *mut libc::c_void) -> bool {
    p as usize == usize::MAX
}

/// Short human-readable size: `1b`, `1k`, `100k`, `1M`, `100M`
pub fn size_name(size: usize) -> String {
    if size >= MIB && size % MIB == 0 {
        format!("{}M", size / MIB)
    } else if size >= KIB && size % KIB == 0 {
        format!("{}k", size / KIB)
    } else {
        format!("{}b", size)
    }
}

/// Report label for the `index`-th size in the suite
///
/// The first row names the primitive; later rows only show the size, all
/// right-aligned so the columns line up.
pub fn label(index: usize, size: usize) -> String {
    let name = if index == 0 {
        format!("sbrk {}", size_name(size))
    } else {
        size_name(size)
    };
    format!("{:>width$}", name, width = LABEL_WIDTH)
}

/// Run `iters` grow/shrink pairs; returns the elapsed time and the number of
/// failed grow calls (whose shrink is skipped)
#[inline(never)]
fn grow_shrink(size: libc::intptr_t, iters: u64) -> Result<(CpuTime, u64)> {
    let shrink = -size;
    let mut failures = 0u64;
    let elapsed = CpuTime::measure(|| {
        for _ in 0..iters {
            if sbrk_failed(unsafe { libc::sbrk(size) }) {
                failures += 1;
                continue;
            }
            unsafe { libc::sbrk(shrink) };
        }
    })?;
    Ok((elapsed, failures))
}

/// Mean cost of one sbrk call for allocations of `size` bytes
///
/// `iters` pairs issue `2 * iters` calls, less one skipped shrink per failed
/// grow; overhead for `iters` loop iterations is subtracted and both user and
/// system time are divided by the issued call count.
pub fn run_size(index: usize, size: usize, iters: u64) -> Result<BenchResult> {
    let increment = libc::intptr_t::try_from(size)
        .map_err(|_| BenchError::InvalidConfig(format!("sbrk size {size} does not fit intptr_t")))?;

    let (elapsed, failures) = grow_shrink(increment, iters)?;
    let overhead = loop_overhead(iters)?;
    debug!(size, user = elapsed.user, system = elapsed.system, overhead, "sbrk");

    if failures > 0 {
        warn!("sbrk({}) failed {} of {} times", size, failures, iters);
    }

    let mut samples = BlockSamples::new(iters, 2);
    samples.push(elapsed);
    samples.failures = failures;
    samples.skipped_calls = failures;
    Ok(BenchResult::from_samples(label(index, size), &samples, overhead))
}

/// Run every allocation size in order
pub fn run(sizes: &[usize], iters: u64) -> Result<Vec<BenchResult>> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| run_size(i, size, iters))
        .collect()
}
