//! Configuration blocks (`conf/blocks.toml`).
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::toml_loader::{expand_path, load_config};
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct BlocksFile {
    #[serde(default, rename = "block")]
    blocks: Vec<RawBlock>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    name: String,
    source: String,
    target: String,
    #[serde(default)]
    clean: bool,
}

/// A block file merged into a dotfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Display name, e.g. `bashrc`.
    pub name: String,
    /// Block file, resolved against the repository root.
    pub source: PathBuf,
    /// File the block is merged into, with `~` and `$VARS` expanded.
    pub target: PathBuf,
    /// Reset the managed section before merging.
    pub clean: bool,
}

/// Load block definitions.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load(path: &Path, root: &Path, home: &Path) -> Result<Vec<Block>, ConfigError> {
    let file: BlocksFile = load_config(path)?;
    Ok(file
        .blocks
        .into_iter()
        .map(|raw| Block {
            name: raw.name,
            source: root.join(raw.source),
            target: expand_path(&raw.target, home),
            clean: raw.clean,
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn resolves_source_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.toml");
        std::fs::write(
            &path,
            "[[block]]\nname = \"bashrc\"\nsource = \"blocks/bashrc\"\ntarget = \"~/.bashrc\"\n\n\
             [[block]]\nname = \"inputrc\"\nsource = \"blocks/inputrc\"\ntarget = \"~/.inputrc\"\nclean = true\n",
        )
        .unwrap();

        let blocks = load(&path, Path::new("/repo"), Path::new("/home/u")).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].source, PathBuf::from("/repo/blocks/bashrc"));
        assert_eq!(blocks[0].target, PathBuf::from("/home/u/.bashrc"));
        assert!(!blocks[0].clean);
        assert!(blocks[1].clean);
    }

    #[test]
    fn missing_field_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.toml");
        std::fs::write(&path, "[[block]]\nname = \"x\"\n").unwrap();
        assert!(matches!(
            load(&path, dir.path(), dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
