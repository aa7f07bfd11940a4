//! pthread mutex acquisition cost

use tracing::{debug, warn};

use crate::calibrate::loop_overhead;
use crate::cpu_time::CpuTime;
use crate::error::Result;
use crate::measure::{BenchResult, BlockSamples};

/// A block of initialized mutexes with stable addresses
///
/// The locks live in a boxed slice that is never resized, so no mutex moves
/// after `pthread_mutex_init`. Dropping the set unlocks every mutex this
/// set holds and then destroys them all.
pub struct MutexSet {
    locks: Box<[libc::pthread_mutex_t]>,
    held: Box<[bool]>,
}

impl MutexSet {
    /// Allocate and initialize `count` default mutexes
    ///
    /// Returns the `pthread_mutex_init` error code on failure; mutexes
    /// initialized before the failure are destroyed.
    pub fn new(count: usize) -> std::result::Result<Self, i32> {
        let mut locks: Box<[libc::pthread_mutex_t]> =
            (0..count).map(|_| libc::PTHREAD_MUTEX_INITIALIZER).collect();

        for i in 0..locks.len() {
            let rc = unsafe { libc::pthread_mutex_init(&mut locks[i], std::ptr::null()) };
            if rc != 0 {
                for lock in &mut locks[..i] {
                    unsafe { libc::pthread_mutex_destroy(lock) };
                }
                return Err(rc);
            }
        }

        let held = vec![false; count].into_boxed_slice();
        Ok(Self { locks, held })
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Number of mutexes currently locked by this set
    pub fn held(&self) -> usize {
        self.held.iter().filter(|&&h| h).count()
    }

    /// Lock every mutex once; returns the number of failed lock calls
    ///
    /// This is the timed region. Each mutex records whether its lock
    /// succeeded so teardown only unlocks what is held.
    #[inline(never)]
    pub fn lock_all(&mut self) -> u64 {
        let mut failures = 0u64;
        for (lock, held) in self.locks.iter_mut().zip(self.held.iter_mut()) {
            *held = unsafe { libc::pthread_mutex_lock(lock) } == 0;
            failures += !*held as u64;
        }
        failures
    }
}

impl Drop for MutexSet {
    fn drop(&mut self) {
        for (lock, &held) in self.locks.iter_mut().zip(self.held.iter()) {
            let lock: *mut libc::pthread_mutex_t = lock;
            unsafe {
                if held {
                    libc::pthread_mutex_unlock(lock);
                }
                libc::pthread_mutex_destroy(lock);
            }
        }
    }
}

/// Time one repetition block: init `count` mutexes, lock each, tear down
///
/// Returns `None` when the mutexes could not be initialized.
pub fn time_block(count: usize) -> Result<Option<(CpuTime, u64)>> {
    let mut set = match MutexSet::new(count) {
        Ok(set) => set,
        Err(rc) => {
            warn!(
                "pthread_mutex_init: {}",
                std::io::Error::from_raw_os_error(rc)
            );
            return Ok(None);
        }
    };

    let mut failures = 0;
    let elapsed = CpuTime::measure(|| failures = set.lock_all())?;
    drop(set);

    if failures > 0 {
        warn!("pthread_mutex_lock failed {} times", failures);
    }
    Ok(Some((elapsed, failures)))
}

/// Mean cost of `pthread_mutex_lock` over `reps` blocks of `count` locks
pub fn run(count: u64, reps: u64) -> Result<BenchResult> {
    let mut samples = BlockSamples::new(count, 1);

    for rep in 0..reps {
        if let Some((elapsed, failures)) = time_block(count as usize)? {
            debug!(rep, user = elapsed.user, system = elapsed.system, "mutex block");
            samples.push(elapsed);
            samples.failures += failures;
        }
    }

    let overhead = loop_overhead(count)?;
    Ok(BenchResult::from_samples("mutex", &samples, overhead))
}
