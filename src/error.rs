//! Error types for the benchmark suite

use thiserror::Error;

/// Errors that can stop a benchmark run
///
/// Resource failures inside a benchmark (a semaphore that will not
/// initialize, a file that will not open) are not errors at this level.
/// They are logged and counted, and the run continues.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("CPU time source unavailable: {0}")]
    TimingUnavailable(#[source] nix::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;
