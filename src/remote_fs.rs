//! File management on the device for front ends that browse it.

use crate::error::Result;
use crate::format::human_size;
use crate::plan::remote_join;
use crate::probe::remote_size;
use crate::remote::{RemoteCommand, RemoteShell};

/// Immediate contents of a remote directory, each list sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

fn names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.strip_prefix("./").unwrap_or(l))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct RemoteFs<'a, S: ?Sized> {
    shell: &'a S,
}

impl<'a, S: RemoteShell + ?Sized> RemoteFs<'a, S> {
    pub fn new(shell: &'a S) -> Self {
        Self { shell }
    }

    /// Absolute form of `dir`, or `None` if it is not an enterable directory.
    pub fn resolve_dir(&self, dir: &str) -> Result<Option<String>> {
        let result = self.shell.run(&RemoteCommand::resolve_dir(dir))?;
        if !result.succeeded {
            return Ok(None);
        }
        Ok(result.output.lines().last().map(str::to_string))
    }

    pub fn list(&self, dir: &str) -> Result<Listing> {
        let dirs = self.shell.run(&RemoteCommand::list_dirs(dir))?;
        let files = self.shell.run(&RemoteCommand::list_files(dir))?;
        Ok(Listing {
            dirs: if dirs.succeeded { names(&dirs.output) } else { Vec::new() },
            files: if files.succeeded { names(&files.output) } else { Vec::new() },
        })
    }

    /// Rename `from` to `to` inside `dir`. `false` if the device refused.
    pub fn rename(&self, dir: &str, from: &str, to: &str) -> Result<bool> {
        let cmd = RemoteCommand::rename(&remote_join(dir, from), &remote_join(dir, to));
        Ok(self.shell.run(&cmd)?.succeeded)
    }

    pub fn remove(&self, paths: &[String]) -> Result<bool> {
        if paths.is_empty() {
            return Ok(true);
        }
        Ok(self.shell.run(&RemoteCommand::remove(paths))?.succeeded)
    }

    pub fn make_dir(&self, path: &str) -> Result<bool> {
        Ok(self.shell.run(&RemoteCommand::mkdir(path))?.succeeded)
    }

    /// Copy entries device-side into `dest_dir`.
    pub fn copy_into(&self, sources: &[String], dest_dir: &str) -> Result<bool> {
        if sources.is_empty() {
            return Ok(true);
        }
        Ok(self
            .shell
            .run(&RemoteCommand::copy_into(sources, dest_dir))?
            .succeeded)
    }

    pub fn size(&self, path: &str) -> Result<u64> {
        remote_size(self.shell, &[path.to_string()])
    }

    /// `"1.5MB (1572864B)"`
    pub fn describe_size(&self, path: &str) -> Result<String> {
        let bytes = self.size(path)?;
        Ok(format!("{} ({}B)", human_size(bytes), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_names_lose_their_dot_slash_only() {
        assert_eq!(
            names("./Alarms\n./.hidden\n./DCIM\n"),
            vec!["Alarms", ".hidden", "DCIM"]
        );
        assert!(names("").is_empty());
    }
}
