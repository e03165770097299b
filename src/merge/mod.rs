//! Idempotent configuration-block merging.
//!
//! A desired block (for example a shipped `.bashrc` fragment) is split into
//! entries and appended to a target file entry by entry.  Entries with an
//! identifier (aliases, exports, functions) are skipped when the target
//! already defines that identifier, whatever its value; every other entry
//! is skipped only when the exact line is already present.  Existing
//! content is never rewritten, so merging the same block twice yields the
//! same bytes as merging it once.
//!
//! The optional clean mode truncates the target at the block's marker line
//! (its first non-blank line) before merging, which resets the managed
//! section while leaving everything above it untouched.

mod entry;

use std::collections::HashSet;

pub use entry::{Entry, EntryKind, assigned_names, classify_line, parse_block};

/// Options for [`merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Truncate the target from the marker line before merging.
    pub clean: bool,
}

/// Why a block entry was not appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The target already defines this alias, export or function name.
    IdentifierPresent(String),
    /// The exact line is already present in the target.
    LinePresent,
    /// Blank lines only separate entries and are never appended on their own.
    Separator,
}

/// Result of merging a block into existing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged file content.
    pub content: String,
    /// Entries appended, in block order.
    pub added: Vec<Entry>,
    /// Entries not appended, with the reason.
    pub skipped: Vec<(Entry, SkipReason)>,
    /// Whether clean mode removed a previous managed section.
    pub cleaned: bool,
}

impl MergeOutcome {
    /// Whether the merged content differs from `existing`.
    #[must_use]
    pub fn changes(&self, existing: &str) -> bool {
        self.content != existing
    }

    /// Skipped entries, excluding blank separators.
    pub fn skipped_entries(&self) -> impl Iterator<Item = &(Entry, SkipReason)> {
        self.skipped
            .iter()
            .filter(|(_, reason)| *reason != SkipReason::Separator)
    }
}

/// First non-blank line of a block, used as the clean-mode marker.
#[must_use]
pub fn marker_line(block: &str) -> Option<&str> {
    block.lines().find(|line| !line.trim().is_empty())
}

/// Merge `block` into `existing`.
///
/// Merging is total: any input text produces an outcome.
#[must_use]
pub fn merge(existing: &str, block: &str, options: MergeOptions) -> MergeOutcome {
    let (base, cleaned) = if options.clean {
        marker_line(block).map_or((existing, false), |marker| {
            truncate_at_marker(existing, marker)
        })
    } else {
        (existing, false)
    };

    let mut inventory = Inventory::from_text(base);
    let mut content = base.to_string();
    let mut added = Vec::new();
    let mut skipped = Vec::new();
    let mut pending_separator = false;

    for entry in parse_block(block) {
        if entry.kind == EntryKind::Blank {
            pending_separator = true;
            skipped.push((entry, SkipReason::Separator));
            continue;
        }

        if let Some(reason) = inventory.skip_reason(&entry) {
            skipped.push((entry, reason));
            continue;
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        let separate = added.is_empty() || pending_separator;
        if separate && !content.is_empty() && !ends_with_blank_line(&content) {
            content.push('\n');
        }
        content.push_str(&entry.text);
        content.push('\n');

        inventory.absorb(&entry.text);
        added.push(entry);
        pending_separator = false;
    }

    MergeOutcome {
        content,
        added,
        skipped,
        cleaned,
    }
}

/// Identifiers and exact lines already defined in a text.
#[derive(Debug, Default)]
struct Inventory {
    aliases: HashSet<String>,
    exports: HashSet<String>,
    functions: HashSet<String>,
    lines: HashSet<String>,
}

impl Inventory {
    fn from_text(text: &str) -> Self {
        let mut inventory = Self::default();
        inventory.absorb(text);
        inventory
    }

    fn absorb(&mut self, text: &str) {
        for line in text.lines() {
            match classify_line(line) {
                EntryKind::Alias(_) => self.aliases.extend(assigned_names(line, "alias")),
                EntryKind::Export(_) | EntryKind::PathExport => {
                    self.exports.extend(assigned_names(line, "export"));
                }
                EntryKind::Function(name) => {
                    self.functions.insert(name);
                }
                _ => {}
            }
            self.lines.insert(line.trim_end().to_string());
        }
    }

    fn skip_reason(&self, entry: &Entry) -> Option<SkipReason> {
        let defined = match &entry.kind {
            EntryKind::Alias(name) => Some((name, &self.aliases)),
            EntryKind::Export(name) => Some((name, &self.exports)),
            EntryKind::Function(name) => Some((name, &self.functions)),
            _ => None,
        };

        match defined {
            Some((name, set)) => set
                .contains(name)
                .then(|| SkipReason::IdentifierPresent(name.clone())),
            None => self
                .lines
                .contains(entry.head().trim_end())
                .then_some(SkipReason::LinePresent),
        }
    }
}

/// Cut `existing` at the first line equal to `marker`.
fn truncate_at_marker<'a>(existing: &'a str, marker: &str) -> (&'a str, bool) {
    let marker = marker.trim_end();
    let mut offset = 0;
    for line in existing.split_inclusive('\n') {
        if line.trim_end() == marker {
            return (existing.get(..offset).unwrap_or(existing), true);
        }
        offset += line.len();
    }
    (existing, false)
}

fn ends_with_blank_line(text: &str) -> bool {
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.rsplit('\n')
        .next()
        .is_none_or(|last| last.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const BLOCK: &str = "\
# ---- syskit managed ----
alias ll='ls -lah'
alias rm='rm -i'
export EDITOR=vim
export PATH=\"$HOME/.local/bin:$PATH\"

shopt -s histappend
mkcd() {
    mkdir -p \"$1\" && cd \"$1\" || return
}
";

    fn merged(existing: &str) -> String {
        merge(existing, BLOCK, MergeOptions::default()).content
    }

    #[test]
    fn merge_into_empty_reproduces_block() {
        assert_eq!(merged(""), BLOCK);
    }

    #[test]
    fn second_merge_is_byte_identical() {
        let existing = "# user stuff\nalias gs='git status'\n";
        let once = merged(existing);
        let twice = merged(&once);
        assert_eq!(once, twice);
        let outcome = merge(&once, BLOCK, MergeOptions::default());
        assert!(outcome.added.is_empty());
        assert!(!outcome.changes(&once));
    }

    #[test]
    fn existing_alias_is_never_rewritten() {
        let existing = "alias rm='rm -v'\n";
        let result = merged(existing);
        assert!(result.starts_with(existing));
        assert!(!result.contains("alias rm='rm -i'"));
        assert_eq!(result.matches("alias rm=").count(), 1);
    }

    #[test]
    fn skip_reasons_are_reported() {
        let outcome = merge(
            "alias rm='rm -v'\nshopt -s histappend\n",
            BLOCK,
            MergeOptions::default(),
        );
        let reasons: Vec<_> = outcome
            .skipped_entries()
            .map(|(_, reason)| reason.clone())
            .collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::IdentifierPresent("rm".to_string()),
                SkipReason::LinePresent,
            ]
        );
    }

    #[test]
    fn existing_content_is_a_prefix_of_the_result() {
        let existing = "export EDITOR=nano\nmkcd() { echo mine; }\n# notes";
        let result = merged(existing);
        assert!(result.starts_with(existing));
        assert!(!result.contains("EDITOR=vim"));
        assert!(!result.contains("mkdir -p"));
    }

    #[test]
    fn missing_trailing_newline_is_completed_before_appending() {
        let result = merge("alias a=b", "alias c=d\n", MergeOptions::default()).content;
        assert_eq!(result, "alias a=b\n\nalias c=d\n");
    }

    #[test]
    fn distinct_path_exports_both_persist() {
        let first = "export PATH=\"$HOME/bin:$PATH\"\n";
        let second = "export PATH=\"$HOME/.cargo/bin:$PATH\"\n";
        let after_first = merge("", first, MergeOptions::default()).content;
        let after_second = merge(&after_first, second, MergeOptions::default()).content;
        assert!(after_second.contains(first.trim_end()));
        assert!(after_second.contains(second.trim_end()));
    }

    #[test]
    fn identical_path_export_is_not_duplicated() {
        let line = "export PATH=\"$HOME/bin:$PATH\"\n";
        let result = merge(line, line, MergeOptions::default()).content;
        assert_eq!(result, line);
    }

    #[test]
    fn duplicates_within_a_block_are_written_once() {
        let block = "alias a=1\nalias a=2\n# note\n# note\n";
        let outcome = merge("", block, MergeOptions::default());
        assert_eq!(outcome.content, "alias a=1\n# note\n");
        assert_eq!(outcome.added.len(), 2);
    }

    #[test]
    fn clean_resets_managed_section() {
        let user = "# mine\nalias gs='git status'\n";
        let installed = merged(user);
        let drifted = format!("{installed}alias extra='echo stale'\n");

        let outcome = merge(&drifted, BLOCK, MergeOptions { clean: true });
        assert!(outcome.cleaned);
        assert_eq!(outcome.content, installed);
        assert!(!outcome.content.contains("extra"));
    }

    #[test]
    fn clean_then_merge_is_idempotent() {
        let user = "alias gs='git status'";
        let first = merge(user, BLOCK, MergeOptions { clean: true }).content;
        let second = merge(&first, BLOCK, MergeOptions { clean: true }).content;
        assert_eq!(first, second);
        assert_eq!(first, format!("{user}\n\n{BLOCK}"));
    }

    #[test]
    fn clean_without_marker_present_only_merges() {
        let outcome = merge("alias x=y\n", BLOCK, MergeOptions { clean: true });
        assert!(!outcome.cleaned);
        assert!(outcome.content.starts_with("alias x=y\n"));
    }

    #[test]
    fn marker_is_first_non_blank_line() {
        assert_eq!(marker_line("\n\n# header\nalias a=b\n"), Some("# header"));
        assert_eq!(marker_line(" \n\n"), None);
    }

    #[test]
    fn block_grouping_is_preserved() {
        let block = "alias a=1\n\n\nalias b=2\nalias c=3\n";
        let result = merge("", block, MergeOptions::default()).content;
        assert_eq!(result, "alias a=1\n\nalias b=2\nalias c=3\n");
    }

    #[test]
    fn conditional_matches_on_head_line() {
        let block = "if [ -f ~/.bash_aliases ]; then\n    . ~/.bash_aliases\nfi\n";
        let existing = "if [ -f ~/.bash_aliases ]; then\n  . ~/.bash_aliases  # tweaked\nfi\n";
        let outcome = merge(existing, block, MergeOptions::default());
        assert!(outcome.added.is_empty());
        assert_eq!(outcome.content, existing);
    }

    #[test]
    fn every_name_on_a_definition_line_counts_as_present() {
        let existing = "alias a=1 b=2\nexport A B=1\n";
        let block = "alias b=3\nexport B=2\nalias c=4\n";
        let outcome = merge(existing, block, MergeOptions::default());
        assert_eq!(outcome.content, "alias a=1 b=2\nexport A B=1\n\nalias c=4\n");
        assert_eq!(outcome.added.len(), 1);
    }

    #[test]
    fn loop_keeps_its_closing_line() {
        let existing = "for x in a b; do\n    echo \"$x\"\ndone\n";
        let block = "# managed\nfor f in ~/.bashrc.d/*.sh; do\n    . \"$f\"\ndone\n";

        let once = merge(existing, block, MergeOptions::default()).content;
        assert_eq!(
            once,
            "for x in a b; do\n    echo \"$x\"\ndone\n\n# managed\nfor f in ~/.bashrc.d/*.sh; do\n    . \"$f\"\ndone\n"
        );
        assert_eq!(merge(&once, block, MergeOptions::default()).content, once);
    }

    #[test]
    fn case_block_is_merged_whole() {
        let existing = "case $TERM in\n    xterm*) ;;\nesac\n";
        let block = "case $- in\n    *i*) ;;\n    *) return ;;\nesac\n";
        let outcome = merge(existing, block, MergeOptions::default());
        assert_eq!(outcome.added.len(), 1);
        assert!(outcome.content.ends_with("    *) return ;;\nesac\n"));
    }

    #[test]
    fn trailing_whitespace_is_ignored_for_exact_matches() {
        let outcome = merge("shopt -s cdspell   \n", "shopt -s cdspell\n", MergeOptions::default());
        assert!(outcome.added.is_empty());
    }
}
