//! File-system resource helpers.
use anyhow::{Context as _, Result};
use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use crate::exec::{Executor, run_as_root};
use crate::resources::error::write_error;

/// Backups of one file allowed within the same second.
const MAX_BACKUPS_PER_SECOND: u32 = 100;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }
    Ok(())
}

/// Path of a timestamped backup for `path`: `<file>.<YYYYmmdd-HHMMSS>.bak`.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    backup_candidates(path).next().unwrap_or_else(|| path.with_extension("bak"))
}

/// Backup names for `path` in the order they are tried:
/// `<file>.<stamp>.bak`, then `<file>.<stamp>.1.bak`, `<file>.<stamp>.2.bak`, ...
fn backup_candidates(path: &Path) -> impl Iterator<Item = PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    let name = path.file_name().unwrap_or_default().to_os_string();
    let path = path.to_path_buf();
    (0..MAX_BACKUPS_PER_SECOND).map(move |n| {
        let mut file = name.clone();
        if n == 0 {
            file.push(format!(".{stamp}.bak"));
        } else {
            file.push(format!(".{stamp}.{n}.bak"));
        }
        path.with_file_name(file)
    })
}

/// Copy `path` to a timestamped backup next to it.
///
/// An existing backup is never overwritten: when the timestamped name is
/// taken, a counter is added before `.bak`. Returns `None` when `path` does
/// not exist.
///
/// # Errors
///
/// Returns an error if the copy fails or every backup name is taken.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    for candidate in backup_candidates(path) {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut out) => {
                let mut src =
                    File::open(path).with_context(|| format!("reading {}", path.display()))?;
                std::io::copy(&mut src, &mut out).map_err(|e| write_error(&candidate, e))?;
                let permissions = src
                    .metadata()
                    .with_context(|| format!("reading {}", path.display()))?
                    .permissions();
                std::fs::set_permissions(&candidate, permissions)
                    .map_err(|e| write_error(&candidate, e))?;
                return Ok(Some(candidate));
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(write_error(&candidate, e)),
        }
    }
    anyhow::bail!("no free backup name for {}", path.display())
}

/// Replace the content of `path`, backing it up first when `backup` is set.
///
/// With `sudo` set, both the backup and the write go through
/// [`write_file_as_root`]. Returns the backup path, if one was taken.
///
/// # Errors
///
/// Returns an error if the backup or the write fails.
pub fn replace_file(
    path: &Path,
    content: &str,
    backup: bool,
    sudo: Option<&dyn Executor>,
) -> Result<Option<PathBuf>> {
    if let Some(executor) = sudo {
        return write_file_as_root(executor, path, content, backup);
    }
    let saved = if backup { backup_file(path)? } else { None };
    write_file(path, content)?;
    Ok(saved)
}

/// Replace the content of a root-owned `path` through `sudo`.
///
/// The content is staged in a temporary file and copied over `path` with
/// `sudo cp`, so the target keeps its owner and mode. A backup, when
/// requested, is copied with `sudo cp -p` to a name no other backup uses.
///
/// # Errors
///
/// Returns an error if staging fails or either `sudo cp` fails.
pub fn write_file_as_root(
    executor: &dyn Executor,
    path: &Path,
    content: &str,
    backup: bool,
) -> Result<Option<PathBuf>> {
    let target = path.to_string_lossy();
    let saved = if backup && path.is_file() {
        let candidate = backup_candidates(path)
            .find(|p| p.symlink_metadata().is_err())
            .ok_or_else(|| anyhow::anyhow!("no free backup name for {}", path.display()))?;
        let dest = candidate.to_string_lossy();
        run_as_root(executor, true, "cp", &["-p", &*target, &*dest])?;
        Some(candidate)
    } else {
        None
    };

    let mut staged = tempfile::NamedTempFile::new().context("creating staging file")?;
    staged
        .write_all(content.as_bytes())
        .and_then(|()| staged.flush())
        .context("writing staging file")?;
    let source = staged.path().to_string_lossy();
    run_as_root(executor, true, "cp", &[&*source, &*target])?;
    Ok(saved)
}

/// Overwrite `path` with `content`, keeping the existing file's mode.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| write_error(path, e))
}

/// Read `path` as UTF-8, treating a missing file as empty.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_or_empty(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Copy `src` to `dst` and mark it executable (`0755`).
///
/// # Errors
///
/// Returns an error if the copy or permission change fails.
pub fn install_executable(src: &Path, dst: &Path) -> Result<()> {
    ensure_parent_dir(dst)?;
    std::fs::copy(src, dst).map_err(|e| write_error(dst, e))?;
    std::fs::set_permissions(dst, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod 755 {}", dst.display()))
}

/// Point `link` at `target`, replacing an existing file or link.
///
/// # Errors
///
/// Returns an error if the old entry cannot be removed or the link created.
pub fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    ensure_parent_dir(link)?;
    if link.symlink_metadata().is_ok() {
        std::fs::remove_file(link)
            .with_context(|| format!("remove existing: {}", link.display()))?;
    }
    std::os::unix::fs::symlink(target, link).map_err(|e| write_error(link, e))
}
