//! Benchmark runner
//!
//! Runs the selected benchmarks sequentially on the calling thread, in the
//! fixed suite order, handing each finished group to a [`Reporter`].

use tracing::info;

use crate::bench::{heap, mutex, open, semaphore};
use crate::config::{Benchmark, SuiteConfig};
use crate::cpu_time::{clock_resolution, CpuTime};
use crate::error::Result;
use crate::report::{Group, Reporter, Summary};

/// Measure one benchmark group
pub fn run_group(bench: Benchmark, config: &SuiteConfig) -> Result<Group> {
    let mut group = Group::new(match bench {
        Benchmark::Mutex => "mutex",
        Benchmark::Sem => "sem",
        Benchmark::Open => "open",
        Benchmark::Sbrk => "sbrk",
    });

    match bench {
        Benchmark::Mutex => group.result(mutex::run(config.mutex_iters, config.reps)?),
        Benchmark::Sem => group.result(semaphore::run(config.sem_iters, config.reps)?),
        Benchmark::Open => {
            let depths = open::run(config.scratch_root(), &config.open_depths, config.open_iters)?;
            for depth in depths {
                group.heading(format!("open depth {}", depth.depth));
                group.result(depth.create);
                group.result(depth.reopen);
            }
        }
        Benchmark::Sbrk => {
            for result in heap::run(&config.sbrk_sizes, config.sbrk_iters)? {
                group.result(result);
            }
        }
    }
    Ok(group)
}

/// Run the configured suite and report every group, then the summary
///
/// The configuration is validated first. Timing-source failures abort the
/// run; resource failures inside a benchmark are logged by the benchmark
/// and do not.
pub fn run(config: &SuiteConfig, reporter: &mut dyn Reporter) -> Result<Summary> {
    config.validate()?;

    for bench in Benchmark::ALL {
        if !config.runs(bench) {
            continue;
        }
        info!("running {:?}", bench);
        let group = run_group(bench, config)?;
        reporter.group(&group)?;
    }

    let summary = Summary {
        total: CpuTime::now()?,
        seconds_per_tick: clock_resolution()?,
    };
    reporter.finish(&summary)?;
    Ok(summary)
}
