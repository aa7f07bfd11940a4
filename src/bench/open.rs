//! open(2) cost for new files and for reopening an existing file
//!
//! Path depth is varied by nesting directories named `a` under one scratch
//! root. The deepest configuration is created once, which also creates every
//! shallower prefix, and the whole tree is removed when the [`ScratchTree`]
//! guard drops. Removal walks the known `a/` chain from the deepest level up,
//! so it never holds more than one directory handle at a time no matter how
//! deep the tree is.

use std::ffi::CString;
use std::os::fd::RawFd;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibrate::loop_overhead;
use crate::cpu_time::CpuTime;
use crate::error::{BenchError, Result};
use crate::measure::{BenchResult, BlockSamples};

/// Scratch directory tree, removed on drop
#[derive(Debug)]
pub struct ScratchTree {
    root: PathBuf,
    max_depth: usize,
}

impl ScratchTree {
    /// Create `root` and the nested `a/a/...` chain down to `max_depth`
    pub fn create(root: PathBuf, max_depth: usize) -> std::io::Result<Self> {
        let tree = Self { root, max_depth };
        std::fs::create_dir_all(tree.dir_at(max_depth))?;
        Ok(tree)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory `depth` levels below the root
    pub fn dir_at(&self, depth: usize) -> PathBuf {
        let mut dir = self.root.clone();
        for _ in 0..depth {
            dir.push("a");
        }
        dir
    }

    /// Remove the tree one level at a time, deepest first
    ///
    /// Levels that were never created are skipped. The next `a` level is
    /// already gone when a directory is emptied, so any subdirectory left in
    /// it is a stray and is removed recursively.
    pub fn remove(&self) -> std::io::Result<()> {
        for depth in (0..=self.max_depth).rev() {
            let dir = self.dir_at(depth);
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    std::fs::remove_dir_all(entry.path())?;
                } else {
                    std::fs::remove_file(entry.path())?;
                }
            }
            std::fs::remove_dir(&dir)?;
        }
        Ok(())
    }
}

impl Drop for ScratchTree {
    fn drop(&mut self) {
        match self.remove() {
            Ok(()) => debug!("removed scratch tree {}", self.root.display()),
            Err(e) => warn!("failed to remove {}: {}", self.root.display(), e),
        }
    }
}

/// Raw descriptors returned by `open`; failed opens are kept as -1 and
/// never closed
struct Descriptors(Vec<RawFd>);

impl Descriptors {
    fn with_capacity(n: usize) -> Self {
        Self(Vec::with_capacity(n))
    }

    fn failures(&self) -> u64 {
        self.0.iter().filter(|&&fd| fd < 0).count() as u64
    }

    /// Close every descriptor after the first `keep`
    fn close_from(&mut self, keep: usize) {
        if self.0.len() > keep {
            for fd in self.0.drain(keep..) {
                close_fd(fd);
            }
        }
    }
}

impl Drop for Descriptors {
    fn drop(&mut self) {
        self.close_from(0);
    }
}

fn close_fd(fd: RawFd) {
    if fd >= 0 {
        unsafe { libc::close(fd) };
    }
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes()).map_err(|e| std::io::Error::from(e).into())
}

/// Create and reopen results for one path depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthResult {
    pub depth: usize,
    /// Length in bytes of the first file's path
    pub path_len: usize,
    pub create: BenchResult,
    pub reopen: BenchResult,
}

/// Time creating `count` new files in `dir`, then reopening the first one
/// `count` times
pub fn run_depth(dir: &Path, depth: usize, count: u64) -> Result<DepthResult> {
    let n = count as usize;
    let paths = (0..n)
        .map(|i| dir.join(i.to_string()))
        .collect::<Vec<_>>();

    // Create must hit files that do not exist yet
    for path in &paths {
        if path.exists() {
            debug!("removing stale {}", path.display());
            std::fs::remove_file(path)?;
        }
    }
    let c_paths = paths
        .iter()
        .map(|p| c_path(p))
        .collect::<Result<Vec<_>>>()?;
    let path_len = c_paths.first().map_or(0, |p| p.as_bytes().len());

    let mut fds = Descriptors::with_capacity(n);
    let created = CpuTime::measure(|| {
        for path in &c_paths {
            fds.0.push(unsafe {
                libc::open(path.as_ptr(), libc::O_RDONLY | libc::O_CREAT, 0o644 as libc::c_uint)
            });
        }
    })?;
    let create_overhead = loop_overhead(count)?;

    let mut create_samples = BlockSamples::new(count, 1);
    create_samples.push(created);
    create_samples.failures = fds.failures();
    if create_samples.failures > 0 {
        warn!(
            "open(O_CREAT) failed {} of {} times at depth {}",
            create_samples.failures, count, depth
        );
    }

    // Keep the first file open while it is reopened
    fds.close_from(1);

    let mut reopened = Descriptors::with_capacity(n);
    let first = match c_paths.first() {
        Some(p) => p.as_ptr(),
        None => std::ptr::null(),
    };
    let reopen_time = CpuTime::measure(|| {
        for _ in 0..n {
            reopened.0.push(unsafe { libc::open(first, libc::O_RDONLY) });
        }
    })?;
    let reopen_overhead = loop_overhead(count)?;

    let mut reopen_samples = BlockSamples::new(count, 1);
    reopen_samples.push(reopen_time);
    reopen_samples.failures = reopened.failures();
    if reopen_samples.failures > 0 {
        warn!(
            "reopen failed {} of {} times at depth {}",
            reopen_samples.failures, count, depth
        );
    }

    drop(reopened);
    drop(fds);

    Ok(DepthResult {
        depth,
        path_len,
        create: BenchResult::from_samples("create", &create_samples, create_overhead),
        reopen: BenchResult::from_samples("reopen", &reopen_samples, reopen_overhead),
    })
}

/// Run every depth configuration under a fresh scratch tree at `root`
///
/// If the tree cannot be created the failure is logged and no results are
/// produced. A depth that hits a filesystem error is logged and skipped.
/// Only a timing failure aborts the run. The tree is removed before
/// returning, on success or error.
pub fn run(root: PathBuf, depths: &[usize], count: u64) -> Result<Vec<DepthResult>> {
    let max_depth = depths.iter().copied().max().unwrap_or(0);
    let tree = match ScratchTree::create(root, max_depth) {
        Ok(tree) => tree,
        Err(e) => {
            warn!("cannot create scratch tree: {}", e);
            return Ok(Vec::new());
        }
    };
    debug!("scratch tree at {}", tree.root().display());

    let mut results = Vec::with_capacity(depths.len());
    for &depth in depths {
        match run_depth(&tree.dir_at(depth), depth, count) {
            Ok(result) => results.push(result),
            Err(BenchError::Io(e)) => warn!("skipping open depth {}: {}", depth, e),
            Err(e) => return Err(e),
        }
    }
    Ok(results)
}
