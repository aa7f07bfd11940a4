//! Benchmark suite configuration
//!
//! Defaults are the classic parameters, so running the binary with
//! no flags measures the full suite at the historical iteration counts.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};

/// Most files created per path depth (and descriptors held open at once)
pub const MAX_OPEN_ITERS: u64 = 1000;

/// Deepest synthetic directory nesting; keeps paths well under `PATH_MAX`
pub const MAX_OPEN_DEPTH: usize = 1500;

/// One group of measurements in the suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Benchmark {
    /// pthread_mutex_lock
    Mutex,
    /// sem_post
    Sem,
    /// open(2) of new files and reopen of an existing one
    Open,
    /// sbrk(2) grow/shrink pairs
    Sbrk,
}

impl Benchmark {
    /// Suite order
    pub const ALL: [Benchmark; 4] = [
        Benchmark::Mutex,
        Benchmark::Sem,
        Benchmark::Open,
        Benchmark::Sbrk,
    ];
}

/// Parameters for every benchmark in the suite
///
/// # Example
/// ```
/// use primtime::config::SuiteConfig;
///
/// let config = SuiteConfig::default();
/// assert_eq!(config.mutex_iters, 100_000);
/// assert_eq!(config.reps, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Mutexes locked per repetition block
    pub mutex_iters: u64,
    /// Semaphores posted per repetition block
    pub sem_iters: u64,
    /// Repetition blocks for the mutex and semaphore benchmarks
    pub reps: u64,
    /// Files created (and reopens issued) per path depth
    pub open_iters: u64,
    /// Directory nesting depths for the open benchmark
    pub open_depths: Vec<usize>,
    /// Grow/shrink pairs per allocation size
    pub sbrk_iters: u64,
    /// Allocation sizes in bytes
    pub sbrk_sizes: Vec<usize>,
    /// Parent directory for the open benchmark's scratch tree (default: `$HOME`)
    pub scratch_dir: Option<PathBuf>,
    /// Benchmarks to run, in suite order regardless of listing order
    pub benchmarks: Vec<Benchmark>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            mutex_iters: 100_000,
            sem_iters: 100_000,
            reps: 10,
            open_iters: 900,
            open_depths: vec![1, 500, 1000],
            sbrk_iters: 1_000_000,
            sbrk_sizes: vec![1, 1024, 102_400, 1_048_576, 104_857_600],
            scratch_dir: None,
            benchmarks: Benchmark::ALL.to_vec(),
        }
    }
}

impl SuiteConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn runs(&self, bench: Benchmark) -> bool {
        self.benchmarks.contains(&bench)
    }

    /// Directory the open benchmark creates and later removes
    ///
    /// Always a fresh per-process child of the scratch parent, so removing
    /// it never touches anything the user owns.
    pub fn scratch_root(&self) -> PathBuf {
        let parent = self
            .scratch_dir
            .clone()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(std::env::temp_dir);
        parent.join(format!(".primtime-{}", std::process::id()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("mutex_iters", self.mutex_iters),
            ("sem_iters", self.sem_iters),
            ("reps", self.reps),
            ("open_iters", self.open_iters),
            ("sbrk_iters", self.sbrk_iters),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(invalid(format!("{name} must be > 0")));
            }
        }

        if self.open_iters > MAX_OPEN_ITERS {
            return Err(invalid(format!(
                "open_iters must be <= {MAX_OPEN_ITERS}, got {}",
                self.open_iters
            )));
        }

        if self.open_depths.is_empty() {
            return Err(invalid("open_depths must not be empty".to_string()));
        }
        if let Some(&depth) = self.open_depths.iter().find(|&&d| d > MAX_OPEN_DEPTH) {
            return Err(invalid(format!(
                "open depth must be <= {MAX_OPEN_DEPTH}, got {depth}"
            )));
        }

        if self.sbrk_sizes.is_empty() {
            return Err(invalid("sbrk_sizes must not be empty".to_string()));
        }
        if let Some(&size) = self.sbrk_sizes.iter().find(|&&s| isize::try_from(s).is_err()) {
            return Err(invalid(format!("sbrk size {size} does not fit isize")));
        }

        if self.benchmarks.is_empty() {
            return Err(invalid("no benchmarks selected".to_string()));
        }

        Ok(())
    }
}

fn invalid(msg: String) -> BenchError {
    BenchError::InvalidConfig(msg)
}
