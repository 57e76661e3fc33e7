#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rocketlink::error::{Result, TransferError};
use rocketlink::{CommandResult, CopyPrimitive, Markers, RemoteShell};
use tempfile::TempDir;

pub fn setup_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

pub fn write_file(path: &Path, len: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(path, vec![b'x'; len]).expect("write test file");
}

/// Marker files under `dir`, read and written without `run-as`.
pub fn markers_in(dir: &Path) -> Markers {
    let at = |name: &str| dir.join(name).to_string_lossy().into_owned();
    Markers {
        run_as: None,
        request: at("launch.txt"),
        received: at("key_a"),
        done: at("key_b"),
    }
}

struct Rule {
    needle: String,
    replies: VecDeque<CommandResult>,
}

#[derive(Default)]
struct Script {
    rules: Vec<Rule>,
    log: Vec<String>,
    broken_copies: Vec<String>,
    transport_down: bool,
}

/// A device that answers from a script and records every command it is sent.
///
/// Commands are matched against rules by substring, first rule wins. A rule's
/// replies are used in order and the last one repeats. Unmatched commands fail.
#[derive(Clone, Default)]
pub struct ScriptedShell {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, needle: &str, replies: Vec<CommandResult>) -> &Self {
        assert!(!replies.is_empty(), "a rule needs at least one reply");
        self.inner.lock().unwrap().rules.push(Rule {
            needle: needle.to_string(),
            replies: replies.into(),
        });
        self
    }

    /// Copies whose source contains `needle` fail.
    pub fn fail_copies_of(&self, needle: &str) -> &Self {
        self.inner.lock().unwrap().broken_copies.push(needle.to_string());
        self
    }

    /// Every command fails to reach the device until `set_transport_down(false)`.
    pub fn set_transport_down(&self, down: bool) {
        self.inner.lock().unwrap().transport_down = down;
    }

    pub fn commands(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(needle)).count()
    }
}

impl RemoteShell for ScriptedShell {
    fn execute(&self, command: &str) -> Result<CommandResult> {
        let mut script = self.inner.lock().unwrap();
        script.log.push(command.to_string());
        if script.transport_down {
            return Err(TransferError::Transport("link down".into()));
        }
        let reply = script
            .rules
            .iter_mut()
            .find(|r| command.contains(&r.needle))
            .map(|rule| {
                if rule.replies.len() > 1 {
                    rule.replies.pop_front().unwrap()
                } else {
                    rule.replies[0].clone()
                }
            });
        Ok(reply.unwrap_or_else(|| CommandResult::failed("")))
    }
}

impl ScriptedShell {
    fn copy(&self, verb: &str, source: &str, destination: &str) -> Result<()> {
        let mut script = self.inner.lock().unwrap();
        script.log.push(format!("{} {} {}", verb, source, destination));
        if script.broken_copies.iter().any(|n| source.contains(n.as_str())) {
            return Err(TransferError::ItemCopy {
                source_path: source.to_string(),
                destination: destination.to_string(),
                reason: "No space left on device".into(),
            });
        }
        Ok(())
    }
}

impl CopyPrimitive for ScriptedShell {
    fn push(&self, local: &Path, remote: &str) -> Result<()> {
        self.copy("push", &local.to_string_lossy(), remote)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        self.copy("pull", remote, &local.to_string_lossy())
    }
}
