use std::fs;
use std::path::Path;
use std::process::Command;

use walkdir::WalkDir;

use super::{capture, to_result, CommandResult, CopyPrimitive, RemoteShell};
use crate::error::{Result, TransferError};

/// Treats this machine as the device: commands run under `sh -c` and copies
/// are plain filesystem copies. Used for loopback runs and tests.
#[derive(Debug, Clone, Default)]
pub struct LocalLink;

impl LocalLink {
    pub fn new() -> Self {
        LocalLink
    }
}

impl RemoteShell for LocalLink {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        let output = capture(Command::new("sh").arg("-c").arg(command))?;
        Ok(to_result(&output))
    }
}

impl CopyPrimitive for LocalLink {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        copy_tree(local, Path::new(remote))
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        copy_tree(Path::new(remote), local)
    }
}

/// Copy a file, or a directory recursively, to `dst`.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let item_err = |reason: String| TransferError::ItemCopy {
        source_path: src.to_string_lossy().to_string(),
        destination: dst.to_string_lossy().to_string(),
        reason,
    };

    if !src.is_dir() {
        return fs::copy(src, dst)
            .map(|_| ())
            .map_err(|e| item_err(e.to_string()));
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| item_err(e.to_string()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| item_err(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| item_err(e.to_string()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).map_err(|e| item_err(e.to_string()))?;
        }
    }
    Ok(())
}
