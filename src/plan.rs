//! Turning a request into a fixed list of copies.
//!
//! A [`TransferSession`] is built once and never changes: the executor walks
//! its items, and the progress monitor polls its tracked destinations, both
//! from the same snapshot.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Result, TransferError};
use crate::manifest::Manifest;
use crate::probe::{local_size, remote_exists};
use crate::remote::RemoteShell;
use crate::resolve::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// This machine → device.
    Push,
    /// Device → this machine.
    Pull,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub source: String,
    pub destination: String,
    pub is_file: bool,
}

/// A push that lands in a hidden directory first and is moved into place
/// only once everything arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staging {
    /// Absolute remote path of the staging directory.
    pub dir: String,
    /// Where the entries end up.
    pub root: String,
    /// Resolved top-level names, all free in `root` at plan time.
    pub names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TransferSession {
    direction: Direction,
    items: Vec<TransferItem>,
    total_bytes: u64,
    tracked: Vec<String>,
    mkdir_root: Option<String>,
    leaf_dirs: Vec<String>,
    staging: Option<Staging>,
    started_at: Instant,
}

impl TransferSession {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Every copy, in execution order.
    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    /// Source-side byte total, measured once at plan time.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// One destination per requested source; what the progress monitor polls.
    pub fn tracked_destinations(&self) -> &[String] {
        &self.tracked
    }

    /// Leaf directories to create before a push, relative to [`mkdir_root`].
    ///
    /// [`mkdir_root`]: TransferSession::mkdir_root
    pub fn leaf_dirs(&self) -> &[String] {
        &self.leaf_dirs
    }

    pub fn mkdir_root(&self) -> Option<&str> {
        self.mkdir_root.as_deref()
    }

    pub fn staging(&self) -> Option<&Staging> {
        self.staging.as_ref()
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }
}

// ── Remote path helpers ────────────────────────────────────────────────

pub fn remote_join(root: &str, name: &str) -> String {
    if root.ends_with('/') {
        format!("{}{}", root, name)
    } else {
        format!("{}/{}", root, name)
    }
}

pub fn remote_basename(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

/// A relative local path with `/` separators.
fn to_remote_rel(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Name of a fresh staging directory for `root`.
pub fn staging_dir_name(root: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(root.as_bytes());
    hasher.update(nanos.to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!(".rocketlink-{}", &digest[..16])
}

// ── Pull ───────────────────────────────────────────────────────────────

/// Map every manifest entry to a free name under `local_root`.
pub fn plan_pull(manifest: &Manifest, local_root: &Path) -> Result<TransferSession> {
    let mut chosen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(manifest.entries.len());

    for entry in &manifest.entries {
        let name = remote_basename(&entry.remote_path);
        // `..` would land outside local_root.
        if matches!(name, "" | "." | "..") {
            return Err(TransferError::Plan(format!(
                "manifest entry has no usable name: {:?}",
                entry.remote_path
            )));
        }
        let candidate = local_root.join(name).to_string_lossy().into_owned();
        let destination = resolve(&candidate, !entry.is_file, |p| {
            Ok(chosen.contains(p) || Path::new(p).exists())
        })?;
        chosen.insert(destination.clone());
        items.push(TransferItem {
            source: entry.remote_path.clone(),
            destination,
            is_file: entry.is_file,
        });
    }

    let tracked = items.iter().map(|i| i.destination.clone()).collect();
    debug!(items = items.len(), total = manifest.total_bytes, "pull planned");
    Ok(TransferSession {
        direction: Direction::Pull,
        items,
        total_bytes: manifest.total_bytes,
        tracked,
        mkdir_root: None,
        leaf_dirs: Vec::new(),
        staging: None,
        started_at: Instant::now(),
    })
}

// ── Push ───────────────────────────────────────────────────────────────

/// Options for [`plan_push`].
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Copy into a hidden staging directory, then move into `remote_root`.
    pub staging: bool,
}

/// Map local sources onto free names under `remote_root`, flattening
/// directories into per-file copies plus the leaf directories that recreate
/// their skeleton.
pub fn plan_push<S>(
    shell: &S,
    sources: &[PathBuf],
    remote_root: &str,
    options: &PushOptions,
) -> Result<TransferSession>
where
    S: RemoteShell + ?Sized,
{
    if sources.is_empty() {
        return Err(TransferError::Plan("nothing to push".into()));
    }

    let staging_name = options.staging.then(|| staging_dir_name(remote_root));
    let target_root = match &staging_name {
        Some(name) => remote_join(remote_root, name),
        None => remote_root.to_string(),
    };
    // Leaf paths are relative to remote_root; with staging they sit one level down.
    let leaf_prefix = match &staging_name {
        Some(name) => format!("{}/", name),
        None => String::new(),
    };

    let mut chosen: HashSet<String> = HashSet::new();
    let mut items = Vec::new();
    let mut tracked = Vec::new();
    let mut leaf_dirs = Vec::new();
    let mut names = Vec::new();
    let mut total_bytes = 0u64;

    if let Some(name) = &staging_name {
        leaf_dirs.push(name.clone());
    }

    for source in sources {
        let source = named_source(source)?;
        let meta = fs::metadata(&source).map_err(|e| TransferError::io(&source, e))?;
        let is_dir = meta.is_dir();
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| TransferError::Plan(format!("{}: no filename", source.display())))?;

        total_bytes += local_size(&source);

        let candidate = remote_join(remote_root, &name);
        let resolved = resolve(&candidate, is_dir, |p| {
            Ok(chosen.contains(p) || remote_exists(shell, p)?)
        })?;
        chosen.insert(resolved.clone());
        let resolved_name = remote_basename(&resolved).to_string();
        let destination = remote_join(&target_root, &resolved_name);

        if is_dir {
            let (leaves, files) = flatten_dir(&source, &resolved_name)?;
            leaf_dirs.extend(leaves.into_iter().map(|l| format!("{}{}", leaf_prefix, l)));
            items.extend(files.into_iter().map(|(local, rel)| TransferItem {
                source: local.to_string_lossy().into_owned(),
                destination: remote_join(&target_root, &rel),
                is_file: true,
            }));
        } else {
            items.push(TransferItem {
                source: source.to_string_lossy().into_owned(),
                destination: destination.clone(),
                is_file: true,
            });
        }
        tracked.push(destination);
        names.push(resolved_name);
    }

    let staging = staging_name.map(|_| Staging {
        dir: target_root.clone(),
        root: remote_root.to_string(),
        names,
    });

    debug!(
        items = items.len(),
        leaves = leaf_dirs.len(),
        total = total_bytes,
        "push planned"
    );
    Ok(TransferSession {
        direction: Direction::Push,
        items,
        total_bytes,
        tracked,
        mkdir_root: Some(remote_root.to_string()),
        leaf_dirs,
        staging,
        started_at: Instant::now(),
    })
}

/// `.` and `..` have no file name; use their canonical form instead.
fn named_source(source: &Path) -> Result<PathBuf> {
    if source.file_name().is_some() {
        return Ok(source.to_path_buf());
    }
    fs::canonicalize(source).map_err(|e| TransferError::io(source, e))
}

/// Leaf directories and files of `dir`, as paths relative to its parent with
/// the top component renamed to `top_name`.
fn flatten_dir(dir: &Path, top_name: &str) -> Result<(Vec<String>, Vec<(PathBuf, String)>)> {
    let mut dirs: Vec<String> = Vec::new();
    let mut parents: BTreeSet<String> = BTreeSet::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            TransferError::io(path, e.into())
        })?;
        let rel = entry.path().strip_prefix(dir).unwrap_or(Path::new(""));
        let rel = match to_remote_rel(rel) {
            r if r.is_empty() => top_name.to_string(),
            r => format!("{}/{}", top_name, r),
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if let Some((parent, _)) = rel.rsplit_once('/') {
                parents.insert(parent.to_string());
            }
            dirs.push(rel);
        } else if file_type.is_file() {
            files.push((entry.into_path(), rel));
        } else {
            warn!(path = %entry.path().display(), "skipping non-regular file");
        }
    }

    let leaves = dirs.into_iter().filter(|d| !parents.contains(d)).collect();
    Ok((leaves, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;
    use crate::remote::CommandResult;

    /// A device where nothing exists.
    struct EmptyDevice;

    impl RemoteShell for EmptyDevice {
        fn execute(&self, _command: &str) -> Result<CommandResult> {
            Ok(CommandResult::failed(""))
        }
    }

    #[test]
    fn remote_paths() {
        assert_eq!(remote_join("/sdcard/", "a"), "/sdcard/a");
        assert_eq!(remote_join("/sdcard", "a"), "/sdcard/a");
        assert_eq!(remote_basename("/sdcard/Download/x.txt"), "x.txt");
        assert_eq!(remote_basename("/sdcard/dir/"), "dir");
    }

    #[test]
    fn staging_names_are_hidden_and_short() {
        let name = staging_dir_name("/sdcard/Download");
        assert!(name.starts_with(".rocketlink-"));
        assert_eq!(name.len(), ".rocketlink-".len() + 16);
    }

    #[test]
    fn pull_names_do_not_collide_within_a_session() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            total_bytes: 20,
            entries: vec![
                ManifestEntry {
                    remote_path: "/sdcard/a/x.jpg".into(),
                    is_file: true,
                },
                ManifestEntry {
                    remote_path: "/sdcard/b/x.jpg".into(),
                    is_file: true,
                },
            ],
        };
        let session = plan_pull(&manifest, tmp.path()).unwrap();
        let dests: Vec<_> = session.items().iter().map(|i| i.destination.clone()).collect();
        assert_eq!(
            dests,
            vec![
                tmp.path().join("x.jpg").to_string_lossy().into_owned(),
                tmp.path().join("x (1).jpg").to_string_lossy().into_owned(),
            ]
        );
        assert_eq!(session.total_bytes(), 20);
        assert_eq!(session.tracked_destinations(), dests.as_slice());
    }

    #[test]
    fn pull_rejects_dot_names() {
        let tmp = tempfile::tempdir().unwrap();
        for path in ["/sdcard/..", "/sdcard/.", "/"] {
            let manifest = Manifest {
                total_bytes: 1,
                entries: vec![ManifestEntry {
                    remote_path: path.into(),
                    is_file: true,
                }],
            };
            assert!(
                matches!(plan_pull(&manifest, tmp.path()), Err(TransferError::Plan(_))),
                "{path} should be rejected"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn push_through_symlink_counts_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("real.bin");
        fs::write(&real, vec![0u8; 500]).unwrap();
        let link = tmp.path().join("link.bin");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let session = plan_push(&EmptyDevice, &[link], "/r", &PushOptions::default()).unwrap();
        assert_eq!(session.total_bytes(), 500);
        assert_eq!(session.items().len(), 1);
        assert_eq!(session.items()[0].destination, "/r/link.bin");
    }

    #[test]
    fn push_empty_dir_is_its_own_leaf() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("empty");
        fs::create_dir(&empty).unwrap();

        let session = plan_push(&EmptyDevice, &[empty], "/r", &PushOptions::default()).unwrap();
        assert_eq!(session.leaf_dirs(), ["empty".to_string()]);
        assert!(session.items().is_empty());
        assert_eq!(session.tracked_destinations(), ["/r/empty".to_string()]);
        assert_eq!(session.total_bytes(), 0);
    }

    #[test]
    fn push_with_staging_routes_through_hidden_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"12345").unwrap();

        let session =
            plan_push(&EmptyDevice, &[file], "/r", &PushOptions { staging: true }).unwrap();
        let staging = session.staging().unwrap().clone();
        assert!(staging.dir.starts_with("/r/.rocketlink-"));
        assert_eq!(staging.root, "/r");
        assert_eq!(staging.names, vec!["a.txt".to_string()]);
        assert_eq!(session.items()[0].destination, format!("{}/a.txt", staging.dir));
        assert_eq!(session.leaf_dirs(), [remote_basename(&staging.dir).to_string()]);
    }

    #[test]
    fn push_rejects_missing_sources() {
        let tmp = tempfile::tempdir().unwrap();
        let err = plan_push(
            &EmptyDevice,
            &[tmp.path().join("ghost")],
            "/r",
            &PushOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
        assert!(plan_push(&EmptyDevice, &[], "/r", &PushOptions::default()).is_err());
    }
}
