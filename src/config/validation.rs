//! Configuration checks that warn without aborting a run.
use std::collections::HashSet;
use std::path::Path;

use super::blocks::Block;
use super::packages::PackageCatalog;
use super::releases::ReleaseBinary;
use super::settings::FileSetting;

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration source (e.g., "blocks.toml", "packages.toml").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a new warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
///
/// Validators report problems that would make a task skip or fail an item,
/// without stopping the load.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, root: &Path) -> Vec<ValidationWarning>;

    /// Short name of the validated file section.
    fn name(&self) -> &'static str;
}

/// Validator for the package catalog.
#[derive(Debug)]
pub struct PackageValidator<'a> {
    catalog: &'a PackageCatalog,
}

impl<'a> PackageValidator<'a> {
    /// Validate `catalog`.
    #[must_use]
    pub const fn new(catalog: &'a PackageCatalog) -> Self {
        Self { catalog }
    }
}

impl ConfigValidator for PackageValidator<'_> {
    fn validate(&self, _root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut seen_groups = HashSet::new();

        for group in &self.catalog.groups {
            if !seen_groups.insert(group.name.to_ascii_lowercase()) {
                warnings.push(ValidationWarning::new(
                    "packages.toml",
                    &group.name,
                    "duplicate group name",
                ));
            }

            let mut seen = HashSet::new();
            for package in &group.packages {
                let name = package.name();
                if name.trim().is_empty() {
                    warnings.push(ValidationWarning::new(
                        "packages.toml",
                        &group.name,
                        "package name is empty",
                    ));
                } else if name.contains(char::is_whitespace) {
                    warnings.push(ValidationWarning::new(
                        "packages.toml",
                        name,
                        "package name contains whitespace",
                    ));
                } else if !seen.insert(name) {
                    warnings.push(ValidationWarning::new(
                        "packages.toml",
                        name,
                        format!("listed more than once in group '{}'", group.name),
                    ));
                }
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "packages"
    }
}

/// Validator for block definitions.
#[derive(Debug)]
pub struct BlockValidator<'a> {
    blocks: &'a [Block],
}

impl<'a> BlockValidator<'a> {
    /// Validate `blocks`.
    #[must_use]
    pub const fn new(blocks: &'a [Block]) -> Self {
        Self { blocks }
    }
}

impl ConfigValidator for BlockValidator<'_> {
    fn validate(&self, _root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut targets = HashSet::new();

        for block in self.blocks {
            if !block.source.is_file() {
                warnings.push(ValidationWarning::new(
                    "blocks.toml",
                    &block.name,
                    format!("source file does not exist: {}", block.source.display()),
                ));
            }
            if !block.target.is_absolute() {
                warnings.push(ValidationWarning::new(
                    "blocks.toml",
                    &block.name,
                    format!("target is not an absolute path: {}", block.target.display()),
                ));
            }
            if !targets.insert(&block.target) {
                warnings.push(ValidationWarning::new(
                    "blocks.toml",
                    &block.name,
                    format!("target {} is used by another block", block.target.display()),
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "blocks"
    }
}

/// Validator for file settings.
#[derive(Debug)]
pub struct SettingValidator<'a> {
    settings: &'a [FileSetting],
}

impl<'a> SettingValidator<'a> {
    /// Validate `settings`.
    #[must_use]
    pub const fn new(settings: &'a [FileSetting]) -> Self {
        Self { settings }
    }
}

impl ConfigValidator for SettingValidator<'_> {
    fn validate(&self, _root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for setting in self.settings {
            let item = format!("{}:{}", setting.file.display(), setting.key);
            if setting.key.trim().is_empty() {
                warnings.push(ValidationWarning::new("settings.toml", &item, "key is empty"));
            } else if setting.key.starts_with('#') || setting.key.contains(char::is_whitespace) {
                warnings.push(ValidationWarning::new(
                    "settings.toml",
                    &item,
                    "key must be a single word",
                ));
            }
            if !setting.file.is_absolute() {
                warnings.push(ValidationWarning::new(
                    "settings.toml",
                    &item,
                    "file is not an absolute path",
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "settings"
    }
}

/// Validator for release binaries.
#[derive(Debug)]
pub struct ReleaseValidator<'a> {
    releases: &'a [ReleaseBinary],
}

impl<'a> ReleaseValidator<'a> {
    /// Validate `releases`.
    #[must_use]
    pub const fn new(releases: &'a [ReleaseBinary]) -> Self {
        Self { releases }
    }
}

/// Whether `repo` looks like `owner/name`.
fn is_repo_slug(repo: &str) -> bool {
    let mut parts = repo.split('/');
    let valid = |part: Option<&str>| {
        part.is_some_and(|p| {
            !p.is_empty()
                && p.chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
    };
    valid(parts.next()) && valid(parts.next()) && parts.next().is_none()
}

impl ConfigValidator for ReleaseValidator<'_> {
    fn validate(&self, _root: &Path) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for release in self.releases {
            if !is_repo_slug(&release.repo) {
                warnings.push(ValidationWarning::new(
                    "releases.toml",
                    &release.repo,
                    "repo must be of the form owner/name",
                ));
            }
            if release.asset.trim().is_empty() {
                warnings.push(ValidationWarning::new(
                    "releases.toml",
                    &release.repo,
                    "asset pattern is empty and would match any asset",
                ));
            }
            if release.binary.trim().is_empty() || release.binary.contains('/') {
                warnings.push(ValidationWarning::new(
                    "releases.toml",
                    &release.repo,
                    "binary must be a plain file name",
                ));
            }
        }

        warnings
    }

    fn name(&self) -> &'static str {
        "releases"
    }
}

/// Run every validator against a loaded configuration.
#[must_use]
pub fn validate_all(config: &super::Config) -> Vec<ValidationWarning> {
    let validators: Vec<Box<dyn ConfigValidator + '_>> = vec![
        Box::new(PackageValidator::new(&config.packages)),
        Box::new(BlockValidator::new(&config.blocks)),
        Box::new(SettingValidator::new(&config.settings)),
        Box::new(ReleaseValidator::new(&config.releases)),
    ];

    let mut all_warnings = Vec::new();
    for validator in validators {
        let warnings = validator.validate(&config.root);
        if !warnings.is_empty() {
            tracing::debug!("{} validator: {} warning(s)", validator.name(), warnings.len());
        }
        all_warnings.extend(warnings);
    }

    all_warnings
}
