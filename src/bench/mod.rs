// Primitive benchmarks
//
// Every benchmark follows the same calibrated protocol: resources are set up
// outside the timed region, one CpuTime sample is taken per repetition
// block, resources are released outside the timed region, and the blocks
// are folded by measure::BlockSamples with the empty-loop overhead for the
// same iteration count subtracted.

pub mod heap;
pub mod mutex;
pub mod open;
pub mod semaphore;

pub use open::{DepthResult, ScratchTree};
