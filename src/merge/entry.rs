//! Entry classification for configuration blocks.
//!
//! A block is split into [`Entry`] values: single lines, multi-line shell
//! functions, or multi-line compound commands (`if`, loops, `case`).  Each
//! entry carries an [`EntryKind`] describing how its presence in a target
//! file is detected.

use std::fmt;

/// Leading words that mark a line as a shell directive.
const DIRECTIVE_WORDS: &[&str] = &["shopt", "complete", "set", "bind", "source", "eval"];

/// Words opening a compound command, each with the word that closes it.
const COMPOUND_WORDS: &[(&str, &str)] = &[
    ("if", "fi"),
    ("for", "done"),
    ("while", "done"),
    ("until", "done"),
    ("select", "done"),
    ("case", "esac"),
];

/// Syntactic category of a configuration entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// `alias NAME=...`
    Alias(String),
    /// `export NAME=...` for any variable other than `PATH`.
    Export(String),
    /// `export PATH=...`, matched by exact line rather than by name.
    PathExport,
    /// Shell function definition (`name() {`, `function name {`).
    Function(String),
    /// `# ...`
    Comment,
    /// `shopt`, `complete`, `set`, `bind`, `source`, `eval` or a compound
    /// command closed on its own line.
    Directive,
    /// Multi-line `if … fi`, `for`/`while`/`until`/`select … done` or
    /// `case … esac` block.
    Conditional,
    /// Empty or whitespace-only line.
    Blank,
    /// Any other line.
    Line,
}

impl EntryKind {
    /// Identifier used for presence detection, if this category has one.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Alias(name) | Self::Export(name) | Self::Function(name) => Some(name),
            _ => None,
        }
    }

    /// Short label for log output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Alias(_) => "alias",
            Self::Export(_) | Self::PathExport => "export",
            Self::Function(_) => "function",
            Self::Comment => "comment",
            Self::Directive => "directive",
            Self::Conditional => "conditional",
            Self::Blank => "blank",
            Self::Line => "line",
        }
    }
}

/// One mergeable unit of a configuration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Category of the entry.
    pub kind: EntryKind,
    /// The entry's lines joined by `\n`, without a trailing newline.
    pub text: String,
}

impl Entry {
    /// First line of the entry.
    #[must_use]
    pub fn head(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }

    /// Iterate over the entry's lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.identifier() {
            Some(name) => write!(f, "{} {name}", self.kind.label()),
            None => write!(f, "{} '{}'", self.kind.label(), self.head().trim()),
        }
    }
}

/// Classify a single line.
///
/// A function head is reported as [`EntryKind::Function`] even though the
/// entry it opens may span several lines.  The head of a multi-line `if`,
/// loop or `case` is reported as [`EntryKind::Conditional`].
#[must_use]
pub fn classify_line(line: &str) -> EntryKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return EntryKind::Blank;
    }
    if trimmed.starts_with('#') {
        return EntryKind::Comment;
    }
    if let Some(name) = assignment_name(trimmed, "alias") {
        return EntryKind::Alias(name);
    }
    if let Some(name) = assignment_name(trimmed, "export") {
        return if name == "PATH" {
            EntryKind::PathExport
        } else {
            EntryKind::Export(name)
        };
    }
    if let Some(name) = function_name(trimmed) {
        return EntryKind::Function(name);
    }
    let first_word = trimmed.split_whitespace().next().unwrap_or("");
    if let Some(closer) = compound_closer(first_word) {
        return if closes_on_same_line(trimmed, closer) {
            EntryKind::Directive
        } else {
            EntryKind::Conditional
        };
    }
    if DIRECTIVE_WORDS.contains(&first_word) {
        return EntryKind::Directive;
    }
    EntryKind::Line
}

/// Split a block of text into entries.
///
/// Functions end at a `}` line with the same indentation as their head;
/// compound commands end at the `fi`, `done` or `esac` matching their first
/// word, at the same indentation.  An unclosed multi-line entry runs to the
/// end of the block.
#[must_use]
pub fn parse_block(text: &str) -> Vec<Entry> {
    let lines: Vec<&str> = text.lines().collect();
    let mut entries = Vec::new();
    let mut idx = 0;

    while let Some(&line) = lines.get(idx) {
        let kind = classify_line(line);
        let closer = match &kind {
            EntryKind::Function(_) if !line.trim_end().ends_with('}') => Some("}"),
            EntryKind::Conditional => {
                compound_closer(line.split_whitespace().next().unwrap_or(""))
            }
            _ => None,
        };

        let end = closer.map_or(idx, |closer| {
            let indent = indentation(line);
            lines
                .iter()
                .enumerate()
                .skip(idx + 1)
                .find(|(_, l)| closes_entry(l, indent, closer))
                .map_or(lines.len() - 1, |(i, _)| i)
        });

        let body = lines.get(idx..=end).unwrap_or_default().join("\n");
        entries.push(Entry { kind, text: body });
        idx = end + 1;
    }

    entries
}

/// Every name defined by a `keyword NAME[=VALUE] ...` line, in order.
///
/// `alias a=1 b=2` yields `a` and `b`.  Option flags such as `export -n`
/// are skipped, quoted values count as part of their word, and the scan
/// stops at an unquoted `;`, `&`, `|` or comment.
#[must_use]
pub fn assigned_names(line: &str, keyword: &str) -> Vec<String> {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix(keyword) else {
        return Vec::new();
    };
    if !rest.starts_with(char::is_whitespace) {
        return Vec::new();
    }
    shell_words(rest)
        .iter()
        .filter(|w| !w.starts_with('-'))
        .filter_map(|w| {
            let name = w.split('=').next().unwrap_or_default();
            is_identifier(name).then(|| name.to_string())
        })
        .collect()
}

/// The first name defined by a `keyword NAME...` line.
fn assignment_name(trimmed: &str, keyword: &str) -> Option<String> {
    assigned_names(trimmed, keyword).into_iter().next()
}

/// Split `text` into words on unquoted whitespace, keeping quotes in place.
fn shell_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in text.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                } else if c == '\\' && q == '"' {
                    escaped = true;
                }
            }
            None => match c {
                '\\' => {
                    current.push(c);
                    escaped = true;
                }
                '\'' | '"' => {
                    current.push(c);
                    quote = Some(c);
                }
                ';' | '&' | '|' => break,
                '#' if current.is_empty() => break,
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        words.push(std::mem::take(&mut current));
                    }
                }
                c => current.push(c),
            },
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Recognise `name() {`, `name () {`, `function name {` and `function name() {`.
fn function_name(trimmed: &str) -> Option<String> {
    let (has_keyword, rest) = match trimmed.strip_prefix("function") {
        Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
        _ => (false, trimmed),
    };

    let name_end = rest
        .find(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')))
        .unwrap_or(rest.len());
    let (name, tail) = rest.split_at(name_end);
    if name.is_empty() {
        return None;
    }

    let tail = tail.trim_start();
    let (has_parens, tail) = tail
        .strip_prefix("()")
        .map_or((false, tail), |t| (true, t.trim_start()));

    let opens_body = tail.starts_with('{');
    (opens_body && (has_parens || has_keyword)).then(|| name.to_string())
}

fn compound_closer(first_word: &str) -> Option<&'static str> {
    COMPOUND_WORDS
        .iter()
        .find(|(opener, _)| *opener == first_word)
        .map(|&(_, closer)| closer)
}

/// Whether a compound command's head line also contains its `closer`.
fn closes_on_same_line(trimmed: &str, closer: &str) -> bool {
    trimmed
        .split(|c: char| c.is_whitespace() || c == ';')
        .any(|w| w == closer)
}

/// Whether `line` is `closer` at exactly `indent`, optionally followed by a
/// redirection, pipe or comment (`done < list`, `fi # end`).
fn closes_entry(line: &str, indent: &str, closer: &str) -> bool {
    line.strip_prefix(indent)
        .and_then(|rest| rest.strip_prefix(closer))
        .is_some_and(|tail| {
            tail.chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || matches!(c, ';' | '<' | '>' | '|' | '&' | ')'))
        })
}

fn indentation(line: &str) -> &str {
    let trimmed_len = line.trim_start().len();
    line.get(..line.len() - trimmed_len).unwrap_or("")
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}
