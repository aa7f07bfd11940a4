//! POSIX semaphore post cost

use tracing::{debug, warn};

use crate::calibrate::loop_overhead;
use crate::cpu_time::CpuTime;
use crate::error::Result;
use crate::measure::{BenchResult, BlockSamples};

/// A block of unnamed process-private semaphores, each starting at zero
pub struct SemaphoreSet {
    sems: Box<[libc::sem_t]>,
}

impl SemaphoreSet {
    /// Allocate and initialize `count` semaphores with value 0
    ///
    /// On failure the semaphores initialized so far are destroyed and the
    /// OS error is returned.
    pub fn new(count: usize) -> std::io::Result<Self> {
        let mut sems: Box<[libc::sem_t]> = (0..count)
            .map(|_| unsafe { std::mem::zeroed::<libc::sem_t>() })
            .collect();

        for i in 0..sems.len() {
            if unsafe { libc::sem_init(&mut sems[i], 0, 0) } < 0 {
                let err = std::io::Error::last_os_error();
                for sem in &mut sems[..i] {
                    unsafe { libc::sem_destroy(sem) };
                }
                return Err(err);
            }
        }

        Ok(Self { sems })
    }

    pub fn len(&self) -> usize {
        self.sems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sems.is_empty()
    }

    /// Post every semaphore exactly once; returns the number of failed posts
    #[inline(never)]
    pub fn post_all(&mut self) -> u64 {
        let mut failures = 0u64;
        for sem in self.sems.iter_mut() {
            failures += (unsafe { libc::sem_post(sem) } < 0) as u64;
        }
        failures
    }

    /// Current value of semaphore `index`
    pub fn value(&mut self, index: usize) -> Option<i32> {
        let sem = self.sems.get_mut(index)?;
        let mut value = 0;
        (unsafe { libc::sem_getvalue(sem, &mut value) } == 0).then_some(value)
    }
}

impl Drop for SemaphoreSet {
    fn drop(&mut self) {
        for sem in self.sems.iter_mut() {
            unsafe { libc::sem_destroy(sem) };
        }
    }
}

/// Time one repetition block: init `count` semaphores, post each, tear down
///
/// An initialization failure is logged and the block is skipped.
pub fn time_block(count: usize) -> Result<Option<(CpuTime, u64)>> {
    let mut set = match SemaphoreSet::new(count) {
        Ok(set) => set,
        Err(e) => {
            warn!("sem_init: {}", e);
            return Ok(None);
        }
    };

    let mut failures = 0;
    let elapsed = CpuTime::measure(|| failures = set.post_all())?;
    drop(set);

    if failures > 0 {
        warn!("sem_post failed {} times", failures);
    }
    Ok(Some((elapsed, failures)))
}

/// Mean cost of `sem_post` over `reps` blocks of `count` semaphores
pub fn run(count: u64, reps: u64) -> Result<BenchResult> {
    let mut samples = BlockSamples::new(count, 1);

    for rep in 0..reps {
        if let Some((elapsed, failures)) = time_block(count as usize)? {
            debug!(rep, user = elapsed.user, system = elapsed.system, "sem block");
            samples.push(elapsed);
            samples.failures += failures;
        }
    }

    let overhead = loop_overhead(count)?;
    Ok(BenchResult::from_samples("sem", &samples, overhead))
}
