//! Binaries installed from the latest GitHub release of a repository.
use std::fmt;
use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Deserialize;

use super::error::ResourceError;
use super::helpers::fs::{install_executable, replace_symlink};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::Executor;

/// Overall timeout of a single HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// One downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// File name, e.g. `ripgrep-14.1.0-x86_64-unknown-linux-musl.tar.gz`.
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub url: String,
    /// Published digest in `sha256:<hex>` form, when the API provides one.
    #[serde(default)]
    pub digest: Option<String>,
}

/// The parts of a GitHub release used for installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Tag name, e.g. `v1.2.3`.
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Attached assets.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// First asset whose name contains `pattern`.
    #[must_use]
    pub fn find_asset(&self, pattern: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.contains(pattern))
    }
}

/// Where release metadata and assets come from.
pub trait ReleaseSource: Send + Sync + fmt::Debug {
    /// Latest published release of `repo` (`owner/name`).
    ///
    /// # Errors
    ///
    /// Returns an error if the release cannot be fetched or parsed.
    fn latest(&self, repo: &str) -> Result<Release>;

    /// Download `asset` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer or the write fails.
    fn download(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()>;
}

/// [`ReleaseSource`] backed by the GitHub REST API.
pub struct GitHubReleaseSource {
    agent: ureq::Agent,
    api_base: String,
}

impl fmt::Debug for GitHubReleaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubReleaseSource")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl Default for GitHubReleaseSource {
    fn default() -> Self {
        Self::new("https://api.github.com")
    }
}

impl GitHubReleaseSource {
    /// Create a source talking to `api_base`.
    #[must_use]
    pub fn new(api_base: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn get(&self, url: &str, accept: &str) -> Result<ureq::http::Response<ureq::Body>> {
        self.agent
            .get(url)
            .header("Accept", accept)
            .header("User-Agent", concat!("syskit/", env!("CARGO_PKG_VERSION")))
            .call()
            .map_err(|e| {
                ResourceError::Download {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

impl ReleaseSource for GitHubReleaseSource {
    fn latest(&self, repo: &str) -> Result<Release> {
        let url = format!("{}/repos/{repo}/releases/latest", self.api_base);
        let mut response = self.get(&url, "application/vnd.github+json")?;
        let body = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("reading {url}"))?;
        serde_json::from_str(&body).with_context(|| format!("parsing release JSON from {url}"))
    }

    fn download(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        let response = self.get(&asset.url, "application/octet-stream")?;
        let mut reader = response.into_body().into_reader();
        let mut file = std::fs::File::create(dest)
            .with_context(|| format!("creating {}", dest.display()))?;
        std::io::copy(&mut reader, &mut file)
            .with_context(|| format!("downloading {}", asset.name))?;
        Ok(())
    }
}

/// A binary taken from the latest release of a GitHub repository.
#[derive(Debug)]
pub struct ReleaseResource<'a> {
    /// Repository slug, `owner/name`.
    pub repo: String,
    /// Substring selecting the asset to download.
    pub asset_pattern: String,
    /// Name of the executable inside the asset.
    pub binary: String,
    /// Directory the executable is installed into.
    pub install_dir: PathBuf,
    /// Directory that receives a symlink to the installed executable.
    pub link_dir: Option<PathBuf>,
    source: &'a dyn ReleaseSource,
    executor: &'a dyn Executor,
}

impl<'a> ReleaseResource<'a> {
    /// Create a new release resource.
    #[must_use]
    pub const fn new(
        repo: String,
        asset_pattern: String,
        binary: String,
        install_dir: PathBuf,
        link_dir: Option<PathBuf>,
        source: &'a dyn ReleaseSource,
        executor: &'a dyn Executor,
    ) -> Self {
        Self {
            repo,
            asset_pattern,
            binary,
            install_dir,
            link_dir,
            source,
            executor,
        }
    }

    /// Path of the installed executable.
    #[must_use]
    pub fn installed_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary)
    }

    fn link_path(&self) -> Option<PathBuf> {
        self.link_dir.as_ref().map(|dir| dir.join(&self.binary))
    }

    /// Unpack `archive` inside `dir` and return the path of the executable.
    fn unpack(&self, dir: &Path, archive: &Path, name: &str) -> Result<PathBuf> {
        match ArchiveKind::of(name) {
            ArchiveKind::Tar => {
                self.executor.run_in(dir, "tar", &["-xf", name])?;
            }
            ArchiveKind::Zip => {
                self.executor.run_in(dir, "unzip", &["-q", "-o", name])?;
            }
            ArchiveKind::Raw => return Ok(archive.to_path_buf()),
        }
        find_file(dir, &self.binary)?.ok_or_else(|| {
            ResourceError::NotFound {
                resource: format!("{} inside {name}", self.binary),
            }
            .into()
        })
    }
}

/// How a downloaded asset is unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Tar,
    Zip,
    Raw,
}

impl ArchiveKind {
    fn of(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else if lower.ends_with(".tgz")
            || lower.ends_with(".tar")
            || [".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst"]
                .iter()
                .any(|ext| lower.ends_with(ext))
        {
            Self::Tar
        } else {
            Self::Raw
        }
    }
}

/// Depth-first search for a regular file called `name` below `dir`.
fn find_file(dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            subdirs.push(path);
        } else if file_type.is_file() && entry.file_name() == name {
            return Ok(Some(path));
        }
    }
    subdirs.sort();
    for sub in subdirs {
        if let Some(found) = find_file(&sub, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Lowercase hex SHA-256 of the file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::fmt::Write as _;

    let mut file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(buf.get(..n).unwrap_or_default());
    }
    let mut hex = String::with_capacity(64);
    for b in hasher.finalize() {
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}

/// Compare the file against a published `sha256:<hex>` digest.
///
/// Digests in any other algorithm are ignored.
fn verify_digest(asset: &ReleaseAsset, path: &Path) -> Result<()> {
    let Some(expected) = asset
        .digest
        .as_deref()
        .and_then(|d| d.strip_prefix("sha256:"))
    else {
        return Ok(());
    };
    let actual = sha256_file(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ResourceError::ChecksumMismatch {
            asset: asset.name.clone(),
            expected: expected.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

impl Applicable for ReleaseResource<'_> {
    fn description(&self) -> String {
        format!("{} ({})", self.binary, self.repo)
    }

    fn apply(&self) -> Result<ResourceChange> {
        let release = self.source.latest(&self.repo)?;
        let Some(asset) = release.find_asset(&self.asset_pattern) else {
            return Ok(ResourceChange::Skipped {
                reason: format!(
                    "no asset matching '{}' in {} {}",
                    self.asset_pattern, self.repo, release.tag
                ),
            });
        };

        // Removed on drop, including on early return and Ctrl-C unwinding.
        let scratch = tempfile::Builder::new()
            .prefix("syskit-release-")
            .tempdir()
            .context("creating scratch directory")?;
        let archive = scratch.path().join(&asset.name);
        self.source.download(asset, &archive)?;
        verify_digest(asset, &archive)?;

        let binary = self.unpack(scratch.path(), &archive, &asset.name)?;
        let installed = self.installed_path();
        install_executable(&binary, &installed)?;
        if let Some(link) = self.link_path() {
            replace_symlink(&installed, &link)?;
        }
        tracing::debug!("installed {} {} to {}", self.repo, release.tag, installed.display());
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ReleaseResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.installed_path().is_file() {
            return Ok(ResourceState::Missing);
        }
        match self.link_path() {
            Some(link) if std::fs::symlink_metadata(&link).is_err() => {
                Ok(ResourceState::Incorrect {
                    current: format!("{} not linked", link.display()),
                })
            }
            _ => Ok(ResourceState::Correct),
        }
    }
}
