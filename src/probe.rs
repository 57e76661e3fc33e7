//! Existence and size queries against either end of the link.
//!
//! The progress monitor only ever sees a [`PathProbe`]; whether it is asking
//! the local disk (pull) or the device (push) is decided when the session is
//! planned.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::Result;
use crate::remote::{RemoteCommand, RemoteShell};

pub trait PathProbe: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool>;

    /// Combined byte size of every file under every path. Missing paths add 0.
    fn total_size(&self, paths: &[String]) -> Result<u64>;

    fn count_existing(&self, paths: &[String]) -> Result<usize> {
        let mut count = 0;
        for path in paths {
            if self.exists(path)? {
                count += 1;
            }
        }
        Ok(count)
    }
}

// ── Local ──────────────────────────────────────────────────────────────

/// 0 if absent, the length of a plain file, or the sum of all file lengths
/// under a directory.
pub fn local_size(path: &Path) -> u64 {
    let meta = match fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return 0,
    };
    if !meta.is_dir() {
        return meta.len();
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalProbe;

impl PathProbe for LocalProbe {
    fn exists(&self, path: &str) -> Result<bool> {
        Ok(Path::new(path).exists())
    }

    fn total_size(&self, paths: &[String]) -> Result<u64> {
        Ok(paths.iter().map(|p| local_size(Path::new(p))).sum())
    }
}

// ── Remote ─────────────────────────────────────────────────────────────

/// Parse the single number printed by a size command. Anything else is 0.
pub fn parse_size(output: &str) -> u64 {
    output.trim().parse().unwrap_or(0)
}

/// Byte total of all files under `paths`, summed on the device in one round
/// trip. A failed command or unparsable output counts as 0; only a transport
/// failure is an error.
pub fn remote_size<S>(shell: &S, paths: &[String]) -> Result<u64>
where
    S: RemoteShell + ?Sized,
{
    if paths.is_empty() {
        return Ok(0);
    }
    let result = shell.run(&RemoteCommand::size_sum(paths))?;
    if !result.succeeded {
        return Ok(0);
    }
    Ok(parse_size(&result.output))
}

pub fn remote_exists<S>(shell: &S, path: &str) -> Result<bool>
where
    S: RemoteShell + ?Sized,
{
    Ok(shell.run(&RemoteCommand::exists(&[path]))?.succeeded)
}

/// Probes paths on the device through its shell.
#[derive(Debug, Clone)]
pub struct RemoteProbe<S> {
    shell: S,
}

impl<S: RemoteShell> RemoteProbe<S> {
    pub fn new(shell: S) -> Self {
        Self { shell }
    }
}

impl<S: RemoteShell> PathProbe for RemoteProbe<S> {
    fn exists(&self, path: &str) -> Result<bool> {
        remote_exists(&self.shell, path)
    }

    fn total_size(&self, paths: &[String]) -> Result<u64> {
        remote_size(&self.shell, paths)
    }

    /// One batched command instead of one round trip per path.
    fn count_existing(&self, paths: &[String]) -> Result<usize> {
        if paths.is_empty() {
            return Ok(0);
        }
        let result = self.shell.run(&RemoteCommand::exist_flags(paths))?;
        Ok(result.output.lines().filter(|l| l.trim() == "1").count())
    }
}
