use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::plan::{Direction, TransferSession};
use crate::remote::{CopyPrimitive, RemoteCommand, RemoteShell};

/// Copies a session's items one after another.
///
/// The first failure ends the run; nothing after it is attempted and nothing is
/// retried.
pub struct TransferExecutor<'a, S: ?Sized, C: ?Sized> {
    shell: &'a S,
    copier: &'a C,
}

impl<'a, S, C> TransferExecutor<'a, S, C>
where
    S: RemoteShell + ?Sized,
    C: CopyPrimitive + ?Sized,
{
    pub fn new(shell: &'a S, copier: &'a C) -> Self {
        Self { shell, copier }
    }

    /// Returns the number of items copied, which on success is all of them.
    pub fn run(&self, session: &TransferSession) -> Result<usize> {
        if session.direction() == Direction::Push {
            self.create_leaf_dirs(session)?;
        }

        let total = session.items().len();
        for (i, item) in session.items().iter().enumerate() {
            debug!(
                n = i + 1,
                of = total,
                source = %item.source,
                destination = %item.destination,
                "copying"
            );
            match session.direction() {
                Direction::Push => self.copier.push(Path::new(&item.source), &item.destination)?,
                Direction::Pull => self.copier.pull(&item.source, Path::new(&item.destination))?,
            }
        }
        info!(items = total, "all items copied");
        Ok(total)
    }

    /// One `mkdir -p` for the whole directory skeleton.
    fn create_leaf_dirs(&self, session: &TransferSession) -> Result<()> {
        let (Some(root), false) = (session.mkdir_root(), session.leaf_dirs().is_empty()) else {
            return Ok(());
        };
        let cmd = RemoteCommand::mkdir_leaves(root, session.leaf_dirs());
        self.shell.run(&cmd)?.require(&cmd)?;
        Ok(())
    }
}
