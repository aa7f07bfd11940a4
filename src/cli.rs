//! CLI argument parsing for primtime

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{Benchmark, SuiteConfig};
use crate::error::Result;

/// Output format for benchmark results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "primtime")]
#[command(version)]
#[command(about = "Measure the CPU time cost of mutex, semaphore, open and sbrk calls", long_about = None)]
pub struct Cli {
    /// Load suite parameters from a TOML file (flags override it)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Mutexes locked per repetition block
    #[arg(long = "mutex-iters", value_name = "N")]
    pub mutex_iters: Option<u64>,

    /// Semaphores posted per repetition block
    #[arg(long = "sem-iters", value_name = "N")]
    pub sem_iters: Option<u64>,

    /// Repetition blocks for the mutex and semaphore benchmarks
    #[arg(long = "reps", value_name = "N")]
    pub reps: Option<u64>,

    /// Files created per path depth (at most 1000)
    #[arg(long = "open-iters", value_name = "N")]
    pub open_iters: Option<u64>,

    /// Directory nesting depths for the open benchmark
    #[arg(long = "open-depths", value_name = "D,D,...", value_delimiter = ',')]
    pub open_depths: Option<Vec<usize>>,

    /// Grow/shrink pairs per sbrk size
    #[arg(long = "sbrk-iters", value_name = "N")]
    pub sbrk_iters: Option<u64>,

    /// sbrk allocation sizes in bytes
    #[arg(long = "sbrk-sizes", value_name = "BYTES,...", value_delimiter = ',')]
    pub sbrk_sizes: Option<Vec<usize>>,

    /// Parent directory for the open benchmark's scratch tree (default: $HOME)
    #[arg(long = "scratch-dir", value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Run only these benchmarks (repeatable or comma-separated)
    #[arg(long = "only", value_enum, value_delimiter = ',')]
    pub only: Vec<Benchmark>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Build the suite configuration: defaults, then the config file, then
    /// explicit flags
    pub fn suite_config(&self) -> Result<SuiteConfig> {
        let mut config = match &self.config {
            Some(path) => SuiteConfig::from_file(path)?,
            None => SuiteConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut SuiteConfig) {
        if let Some(n) = self.mutex_iters {
            config.mutex_iters = n;
        }
        if let Some(n) = self.sem_iters {
            config.sem_iters = n;
        }
        if let Some(n) = self.reps {
            config.reps = n;
        }
        if let Some(n) = self.open_iters {
            config.open_iters = n;
        }
        if let Some(depths) = &self.open_depths {
            config.open_depths = depths.clone();
        }
        if let Some(n) = self.sbrk_iters {
            config.sbrk_iters = n;
        }
        if let Some(sizes) = &self.sbrk_sizes {
            config.sbrk_sizes = sizes.clone();
        }
        if let Some(dir) = &self.scratch_dir {
            config.scratch_dir = Some(dir.clone());
        }
        if !self.only.is_empty() {
            config.benchmarks = self.only.clone();
        }
    }
}
