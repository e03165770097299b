//! Domain-specific error types for syskit.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`], [`TaskError`])
//! while command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! SyskitError
//! ├── Config(ConfigError)     TOML loading, root resolution
//! ├── Task(TaskError)         task ordering and execution
//! ├── Resource(ResourceError) files, packages, downloads
//! └── Platform(PlatformError) OS and package-manager detection
//! ```
//!
//! Block merging has no error type: every input produces a merge outcome.

use std::path::PathBuf;

use thiserror::Error;

pub use crate::resources::error::ResourceError;

/// Top-level error type for syskit.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum SyskitError {
    /// Configuration-related error (root resolution, parsing, I/O).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task scheduling error (dependency cycle, interruption).
    #[error("Task execution error: {0}")]
    Task(#[from] TaskError),

    /// Resource operation error (file write, package install, download).
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Platform detection error.
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Errors that arise from locating and loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No directory containing `conf/` could be found.
    #[error("Could not locate a syskit root (a directory containing conf/); tried: {0}")]
    RootNotFound(String),

    /// A config file contains invalid TOML or does not match the schema.
    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying deserialization error.
        source: toml::de::Error,
    },

    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise during task execution.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task dependency graph contains a cycle.
    #[error("Task dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// The run was interrupted (Ctrl-C) before all tasks completed.
    #[error("Interrupted after {completed} of {total} tasks")]
    Interrupted {
        /// Tasks that ran to completion.
        completed: usize,
        /// Tasks scheduled in total.
        total: usize,
    },
}

/// Errors that arise from platform detection.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The current operating system is not supported.
    #[error("Operation not supported on {platform}")]
    Unsupported {
        /// Name of the platform (e.g., `"macos"`).
        platform: String,
    },

    /// None of the supported package managers is on PATH.
    #[error("No supported package manager found (tried {0})")]
    NoPackageManager(String),
}
