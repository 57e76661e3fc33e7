//! Remote command strings.
//!
//! Every path that ends up in a command passes through [`shell_quote`]; the
//! rest of the crate never formats a path into a command by hand.

use std::fmt;

/// Shell-escape a string with single quotes.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// A POSIX `sh` command line assembled from literal words and quoted paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    line: String,
}

impl RemoteCommand {
    /// Start a command with a program name (not quoted).
    pub fn new(program: &str) -> Self {
        Self {
            line: program.to_string(),
        }
    }

    /// Append a literal word verbatim. Only for flags and fixed syntax.
    pub fn word(mut self, word: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(word);
        self
    }

    /// Append a quoted path.
    pub fn path(mut self, path: &str) -> Self {
        self.line.push(' ');
        self.line.push_str(&shell_quote(path));
        self
    }

    pub fn paths<I, S>(self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths.into_iter().fold(self, |cmd, p| cmd.path(p.as_ref()))
    }

    /// `self && next`
    pub fn and(self, next: RemoteCommand) -> Self {
        self.join(" && ", next)
    }

    /// `self | next`
    pub fn pipe(self, next: RemoteCommand) -> Self {
        self.join(" | ", next)
    }

    /// `self; next`
    pub fn then(self, next: RemoteCommand) -> Self {
        self.join("; ", next)
    }

    fn join(mut self, sep: &str, next: RemoteCommand) -> Self {
        self.line.push_str(sep);
        self.line.push_str(&next.line);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn into_string(self) -> String {
        self.line
    }

    // ── Canned commands ───────────────────────────────────────────────

    /// Succeeds only if every path exists.
    pub fn exists<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut tests = paths.iter().map(|p| RemoteCommand::new("[ -e").path(p.as_ref()).word("]"));
        let first = tests.next().unwrap_or_else(|| RemoteCommand::new("false"));
        tests.fold(first, RemoteCommand::and)
    }

    /// Prints one `1` or `0` line per path, in order.
    pub fn exist_flags<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut checks = paths.iter().map(|p| {
            RemoteCommand::new("{ [ -e")
                .path(p.as_ref())
                .word("] && echo 1 || echo 0; }")
        });
        let first = checks.next().unwrap_or_else(|| RemoteCommand::new("true"));
        checks.fold(first, RemoteCommand::then)
    }

    /// Prints the byte total of all regular files under `paths`. Missing paths
    /// count as zero; the pipeline's status is awk's, so it succeeds.
    pub fn size_sum<S: AsRef<str>>(paths: &[S]) -> Self {
        RemoteCommand::new("find")
            .paths(paths.iter().map(AsRef::as_ref))
            .word("-type f -exec stat -c%s {} + 2>/dev/null")
            .pipe(RemoteCommand::new("awk '{s += $1} END {print s + 0}'"))
    }

    /// Sorted names of the immediate subdirectories of `dir`.
    pub fn list_dirs(dir: &str) -> Self {
        RemoteCommand::new("cd")
            .path(dir)
            .and(RemoteCommand::new("find . -mindepth 1 -maxdepth 1 -type d"))
            .pipe(RemoteCommand::new("sort"))
    }

    /// Sorted names of the regular files directly inside `dir`.
    pub fn list_files(dir: &str) -> Self {
        RemoteCommand::new("cd")
            .path(dir)
            .and(RemoteCommand::new("find . -mindepth 1 -maxdepth 1 -type f"))
            .pipe(RemoteCommand::new("sort"))
    }

    /// `cd root && mkdir -p leaf...`. Creating every leaf creates the whole tree.
    pub fn mkdir_leaves<S: AsRef<str>>(root: &str, leaves: &[S]) -> Self {
        RemoteCommand::new("cd")
            .path(root)
            .and(RemoteCommand::new("mkdir -p").paths(leaves.iter().map(AsRef::as_ref)))
    }

    pub fn mkdir(path: &str) -> Self {
        RemoteCommand::new("mkdir -p").path(path)
    }

    pub fn rename(from: &str, to: &str) -> Self {
        RemoteCommand::new("mv --").path(from).path(to)
    }

    pub fn remove<S: AsRef<str>>(paths: &[S]) -> Self {
        RemoteCommand::new("rm -rf --").paths(paths.iter().map(AsRef::as_ref))
    }

    /// Recursive copy of `sources` into the directory `dest_dir`.
    pub fn copy_into<S: AsRef<str>>(sources: &[S], dest_dir: &str) -> Self {
        RemoteCommand::new("cp -r --")
            .paths(sources.iter().map(AsRef::as_ref))
            .path(dest_dir)
    }

    pub fn touch(path: &str) -> Self {
        RemoteCommand::new("touch").path(path)
    }

    pub fn cat(path: &str) -> Self {
        RemoteCommand::new("cat").path(path)
    }

    /// `cd dir && pwd`: canonical absolute form of a directory.
    pub fn resolve_dir(dir: &str) -> Self {
        RemoteCommand::new("cd")
            .path(dir)
            .and(RemoteCommand::new("pwd"))
    }

    /// Run `inner` as an app's user (`run-as package ...`), so it can reach the
    /// app's private directory.
    pub fn run_as(package: &str, inner: RemoteCommand) -> Self {
        RemoteCommand::new("run-as").path(package).word(&inner.line)
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}
