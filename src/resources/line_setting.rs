//! `key value` settings in line-oriented system configuration files.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::helpers::fs::replace_file;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Ensures a line `key<separator>value` is active in a config file such as
/// `/etc/ssh/sshd_config`.
///
/// The first uncommented line for `key` is rewritten in place; if there is
/// none, the first commented-out `#key` line is replaced; otherwise the
/// setting is appended.  Files that do not exist are never created.
#[derive(Debug, Clone)]
pub struct LineSettingResource<'a> {
    /// File to edit.
    pub file: PathBuf,
    /// Setting name.
    pub key: String,
    /// Desired value.
    pub value: String,
    /// Text placed between key and value (`" "` or `"="`).
    pub separator: String,
    /// Copy the file to a timestamped backup before writing.
    pub backup: bool,
    /// Write through `sudo` with this executor; `None` writes directly.
    sudo: Option<&'a dyn Executor>,
}

impl<'a> LineSettingResource<'a> {
    /// Create a new line setting resource.
    #[must_use]
    pub const fn new(
        file: PathBuf,
        key: String,
        value: String,
        separator: String,
        backup: bool,
    ) -> Self {
        Self {
            file,
            key,
            value,
            separator,
            backup,
            sudo: None,
        }
    }

    /// Route the backup and the write through `sudo` when `executor` is set.
    #[must_use]
    pub const fn with_sudo(mut self, executor: Option<&'a dyn Executor>) -> Self {
        self.sudo = executor;
        self
    }

    /// The line this resource writes.
    #[must_use]
    pub fn desired_line(&self) -> String {
        format!("{}{}{}", self.key, self.separator, self.value)
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.file.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.file)
            .map(Some)
            .with_context(|| format!("reading {}", self.file.display()))
    }
}

/// Value of the first active (uncommented) `key` line.
#[must_use]
pub fn active_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| setting_value(line.trim_start(), key))
}

/// Return `text` with `key<separator>value` set.
#[must_use]
pub fn set_value(text: &str, key: &str, separator: &str, value: &str) -> String {
    let desired = format!("{key}{separator}{value}");
    let lines: Vec<&str> = text.lines().collect();

    let active = lines
        .iter()
        .position(|l| setting_value(l.trim_start(), key).is_some());
    let commented = || {
        lines.iter().position(|l| {
            l.trim_start()
                .strip_prefix('#')
                .is_some_and(|rest| setting_value(rest.trim_start(), key).is_some())
        })
    };

    let mut out: Vec<String> = lines.iter().map(|l| (*l).to_string()).collect();
    match active.or_else(commented) {
        Some(idx) => {
            if let Some(slot) = out.get_mut(idx) {
                let indent_len = slot.len() - slot.trim_start().len();
                let indent = slot.get(..indent_len).unwrap_or("").to_string();
                *slot = format!("{indent}{desired}");
            }
        }
        None => out.push(desired),
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// If `line` (already left-trimmed) sets `key`, return its value.
fn setting_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    if !(rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '=')) {
        return None;
    }
    Some(
        rest.trim_start_matches(|c: char| c.is_whitespace() || c == '=')
            .trim_end(),
    )
}

impl Applicable for LineSettingResource<'_> {
    fn description(&self) -> String {
        format!("{}: {}", self.file.display(), self.desired_line())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let Some(text) = self.read()? else {
            return Ok(ResourceChange::Skipped {
                reason: format!("{} does not exist", self.file.display()),
            });
        };
        if active_value(&text, &self.key) == Some(self.value.trim()) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        let updated = set_value(&text, &self.key, &self.separator, &self.value);
        replace_file(&self.file, &updated, self.backup, self.sudo)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for LineSettingResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(text) = self.read()? else {
            return Ok(ResourceState::Invalid {
                reason: format!("{} does not exist", self.file.display()),
            });
        };
        Ok(match active_value(&text, &self.key) {
            Some(v) if v == self.value.trim() => ResourceState::Correct,
            Some(v) => ResourceState::Incorrect {
                current: format!("{}{}{v}", self.key, self.separator),
            },
            None => ResourceState::Missing,
        })
    }
}
