use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// A hidden directory next to `target` where new content is assembled.
///
/// The directory is removed on drop unless [`StagingDir::commit`] renamed it
/// into place.
pub(crate) struct StagingDir<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    committed: bool,
}

impl<'a, R: Runtime> StagingDir<'a, R> {
    pub fn new(runtime: &'a R, target: &Path) -> Result<Self> {
        let parent = target
            .parent()
            .with_context(|| format!("Cannot stage {:?}: no parent directory", target))?;
        let file_name = target
            .file_name()
            .with_context(|| format!("Cannot stage {:?}: no file name", target))?
            .to_string_lossy();
        let path = parent.join(format!(".{}.staging-{}", file_name, std::process::id()));

        // Leftover from an interrupted run of this same process id
        if runtime.exists(&path) {
            runtime.remove_dir_all(&path)?;
        }
        runtime.create_dir_all(&path)?;
        debug!("Staging {:?} in {:?}", target, path);

        Ok(Self {
            runtime,
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged content to `target`.
    pub fn commit(mut self, target: &Path) -> Result<()> {
        self.runtime.rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl<R: Runtime> Drop for StagingDir<'_, R> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        debug!("Cleaning up: {:?}", self.path);
        if let Err(e) = self.runtime.remove_dir_all(&self.path) {
            warn!("Failed to remove staging directory {:?}: {:#}", self.path, e);
        }
    }
}
