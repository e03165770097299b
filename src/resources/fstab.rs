//! `nofail` hardening of `/etc/fstab`.
use std::path::PathBuf;

use anyhow::{Context as _, Result};

use super::helpers::fs::replace_file;
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Mount points whose failure should stop the boot.
const ESSENTIAL_MOUNTS: &[&str] = &["/", "/boot", "/boot/efi"];

/// Kernel and virtual filesystems that never need `nofail`.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "proc",
    "sysfs",
    "tmpfs",
    "devtmpfs",
    "devpts",
    "cgroup",
    "cgroup2",
    "securityfs",
    "debugfs",
    "tracefs",
    "configfs",
    "pstore",
    "efivarfs",
    "mqueue",
    "hugetlbfs",
    "bpf",
    "fusectl",
];

/// One fstab entry that would gain `nofail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NofailCandidate {
    /// Zero-based line number in the file.
    pub line: usize,
    /// Mount point (second field).
    pub mount_point: String,
}

/// Ensures every optional mount in an fstab carries the `nofail` option.
#[derive(Debug, Clone)]
pub struct FstabNofailResource<'a> {
    /// Path of the fstab file.
    pub path: PathBuf,
    /// Copy the file to a timestamped backup before writing.
    pub backup: bool,
    sudo: Option<&'a dyn Executor>,
}

impl<'a> FstabNofailResource<'a> {
    /// Create a new resource for `path`.
    #[must_use]
    pub const fn new(path: PathBuf, backup: bool) -> Self {
        Self {
            path,
            backup,
            sudo: None,
        }
    }

    /// Write through `sudo` with `executor` when it is set.
    #[must_use]
    pub const fn with_sudo(mut self, executor: Option<&'a dyn Executor>) -> Self {
        self.sudo = executor;
        self
    }

    fn read(&self) -> Result<Option<String>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

/// Byte ranges of the whitespace-separated fields of `line`.
fn field_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (idx, ch) in line.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, line.len()));
    }
    spans
}

/// Whether the entry on `line` should gain `nofail`; returns the end of its
/// options field when it should.
fn options_end(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let spans = field_spans(line);
    let field = |n: usize| spans.get(n).and_then(|&(s, e)| line.get(s..e));
    let mount_point = field(1)?;
    let fs_type = field(2)?;
    let options = field(3)?;
    let &(_, end) = spans.get(3)?;

    let excluded = ESSENTIAL_MOUNTS.contains(&mount_point)
        || mount_point == "none"
        || fs_type == "swap"
        || PSEUDO_FILESYSTEMS.contains(&fs_type)
        || options.split(',').any(|opt| opt == "nofail");
    (!excluded).then(|| (end, mount_point.to_string()))
}

/// Entries of `fstab` that lack `nofail` and are not essential.
#[must_use]
pub fn nofail_candidates(fstab: &str) -> Vec<NofailCandidate> {
    fstab
        .lines()
        .enumerate()
        .filter_map(|(line, text)| {
            options_end(text).map(|(_, mount_point)| NofailCandidate { line, mount_point })
        })
        .collect()
}

/// Append `,nofail` to the options of every candidate entry.
///
/// Comments, blank lines and column alignment are kept as they are.
#[must_use]
pub fn add_nofail(fstab: &str) -> String {
    let mut out = String::with_capacity(fstab.len() + 64);
    for segment in fstab.split_inclusive('\n') {
        let (line, newline) = segment
            .strip_suffix('\n')
            .map_or((segment, ""), |l| (l, "\n"));
        match options_end(line) {
            Some((end, _)) => {
                out.push_str(line.get(..end).unwrap_or(line));
                out.push_str(",nofail");
                out.push_str(line.get(end..).unwrap_or(""));
            }
            None => out.push_str(line),
        }
        out.push_str(newline);
    }
    out
}

impl Applicable for FstabNofailResource<'_> {
    fn description(&self) -> String {
        format!("{} nofail", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        let Some(text) = self.read()? else {
            return Ok(ResourceChange::Skipped {
                reason: format!("{} does not exist", self.path.display()),
            });
        };
        let updated = add_nofail(&text);
        if updated == text {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        replace_file(&self.path, &updated, self.backup, self.sudo)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for FstabNofailResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let Some(text) = self.read()? else {
            return Ok(ResourceState::Invalid {
                reason: format!("{} does not exist", self.path.display()),
            });
        };
        let candidates = nofail_candidates(&text);
        if candidates.is_empty() {
            return Ok(ResourceState::Correct);
        }
        let mounts: Vec<&str> = candidates.iter().map(|c| c.mount_point.as_str()).collect();
        Ok(ResourceState::Incorrect {
            current: format!("without nofail: {}", mounts.join(", ")),
        })
    }
}
