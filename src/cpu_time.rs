//! Process CPU time sampling
//!
//! All measurements in this crate are taken from the kernel's per-process
//! resource usage counters (`getrusage(RUSAGE_SELF)`), not from a wall
//! clock. A sample holds cumulative user and system time in seconds.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use nix::sys::resource::{getrusage, UsageWho};
use nix::sys::time::TimeVal;
use nix::time::{clock_getres, ClockId};
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// User and system CPU time in seconds
///
/// Used both for cumulative readings and for intervals between two
/// readings; subtracting two samples gives the elapsed interval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuTime {
    pub user: f64,
    pub system: f64,
}

impl CpuTime {
    pub const ZERO: CpuTime = CpuTime {
        user: 0.0,
        system: 0.0,
    };

    pub fn new(user: f64, system: f64) -> Self {
        Self { user, system }
    }

    /// Read the cumulative CPU time consumed by this process
    ///
    /// # Example
    /// ```
    /// use primtime::cpu_time::CpuTime;
    ///
    /// let before = CpuTime::now().unwrap();
    /// let after = CpuTime::now().unwrap();
    /// assert!(after.user >= before.user);
    /// ```
    pub fn now() -> Result<Self> {
        let usage = getrusage(UsageWho::RUSAGE_SELF).map_err(BenchError::TimingUnavailable)?;
        Ok(Self {
            user: timeval_secs(usage.user_time()),
            system: timeval_secs(usage.system_time()),
        })
    }

    /// Run `f` and return the CPU time it consumed
    pub fn measure<F>(f: F) -> Result<Self>
    where
        F: FnOnce(),
    {
        let start = Self::now()?;
        f();
        let end = Self::now()?;
        Ok(end - start)
    }

    /// Divide both components by `divisor`
    pub fn per(self, divisor: f64) -> Self {
        Self {
            user: self.user / divisor,
            system: self.system / divisor,
        }
    }

    /// Replace negative components with zero
    ///
    /// Tick granularity of the rusage counters can make a small interval
    /// minus its loop overhead come out below zero.
    pub fn clamp_non_negative(self) -> Self {
        Self {
            user: self.user.max(0.0),
            system: self.system.max(0.0),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.user.is_finite() && self.system.is_finite()
    }
}

impl Add for CpuTime {
    type Output = CpuTime;

    fn add(self, rhs: CpuTime) -> CpuTime {
        CpuTime {
            user: self.user + rhs.user,
            system: self.system + rhs.system,
        }
    }
}

impl AddAssign for CpuTime {
    fn add_assign(&mut self, rhs: CpuTime) {
        *self = *self + rhs;
    }
}

impl Sub for CpuTime {
    type Output = CpuTime;

    fn sub(self, rhs: CpuTime) -> CpuTime {
        CpuTime {
            user: self.user - rhs.user,
            system: self.system - rhs.system,
        }
    }
}

impl Sum for CpuTime {
    fn sum<I: Iterator<Item = CpuTime>>(iter: I) -> CpuTime {
        iter.fold(CpuTime::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a CpuTime> for CpuTime {
    fn sum<I: Iterator<Item = &'a CpuTime>>(iter: I) -> CpuTime {
        iter.copied().sum()
    }
}

fn timeval_secs(tv: TimeVal) -> f64 {
    tv.tv_sec() as f64 + tv.tv_usec() as f64 / 1e6
}

/// Resolution of the real-time clock in seconds
pub fn clock_resolution() -> Result<f64> {
    let res = clock_getres(ClockId::CLOCK_REALTIME).map_err(BenchError::TimingUnavailable)?;
    Ok(res.tv_sec() as f64 + res.tv_nsec() as f64 / 1e9)
}
