//! primtime - CPU time cost of POSIX primitives
//!
//! This library measures the mean user and system CPU time of mutex
//! locking, semaphore posting, opening files at varying path depths, and
//! growing the heap with sbrk. Every measurement subtracts the overhead of
//! an empty loop with the same iteration count before averaging.

pub mod bench;
pub mod calibrate;
pub mod cli;
pub mod config;
pub mod cpu_time;
pub mod error;
pub mod measure;
pub mod report;
pub mod suite;
