//! Configuration block merged into a dotfile.
use std::path::PathBuf;

use anyhow::Result;

use super::helpers::fs::{ensure_parent_dir, read_or_empty, replace_file};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::merge::{self, MergeOptions, MergeOutcome};

/// A block of shell configuration that should be present in a target file.
///
/// The block is merged with [`merge::merge`]: entries are appended only when
/// missing, so the resource never rewrites lines the user already has.
#[derive(Debug, Clone)]
pub struct ConfigBlockResource {
    /// File the block is merged into.
    pub target: PathBuf,
    /// Desired block text.
    pub block: String,
    /// Reset the managed section from its marker line before merging.
    pub clean: bool,
    /// Copy the target to a timestamped backup before writing.
    pub backup: bool,
}

impl ConfigBlockResource {
    /// Create a new config block resource.
    #[must_use]
    pub const fn new(target: PathBuf, block: String, clean: bool, backup: bool) -> Self {
        Self {
            target,
            block,
            clean,
            backup,
        }
    }

    /// Merge the block into the current target content without writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the target exists but cannot be read.
    pub fn plan(&self) -> Result<(String, MergeOutcome)> {
        let existing = read_or_empty(&self.target)?;
        let outcome = merge::merge(&existing, &self.block, MergeOptions { clean: self.clean });
        Ok((existing, outcome))
    }

    /// Write a previously computed merge outcome to the target.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup or the write fails.
    pub fn write(&self, outcome: &MergeOutcome) -> Result<Option<PathBuf>> {
        ensure_parent_dir(&self.target)?;
        replace_file(&self.target, &outcome.content, self.backup, None)
    }
}

impl Applicable for ConfigBlockResource {
    fn description(&self) -> String {
        self.target.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let (existing, outcome) = self.plan()?;
        if self.target.exists() && !outcome.changes(&existing) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.write(&outcome)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ConfigBlockResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.target.exists() {
            return Ok(ResourceState::Missing);
        }
        let (existing, outcome) = self.plan()?;
        if !outcome.changes(&existing) {
            return Ok(ResourceState::Correct);
        }
        let current = match (outcome.added.len(), outcome.cleaned) {
            (n, true) => format!("managed section outdated, {n} entries to write"),
            (1, false) => "1 entry missing".to_string(),
            (n, false) => format!("{n} entries missing"),
        };
        Ok(ResourceState::Incorrect { current })
    }
}
