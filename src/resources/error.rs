//! Typed error variants for resource operations.
//!
//! This module provides [`ResourceError`], a structured error type for
//! resource check and apply operations.  Internal resource code may return
//! these variants directly; callers convert to [`anyhow::Error`] via `?`.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Errors that arise from resource checks and apply operations.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A command invoked by a resource failed with a non-zero exit code.
    #[error("command '{program}' failed (exit {exit_code}): {stderr}")]
    ExecutionFailed {
        /// Name of the program that was invoked.
        program: String,
        /// Exit code returned by the process.
        exit_code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// A required resource (file, release asset, binary) was not found.
    #[error("resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource.
        resource: String,
    },

    /// An operation was denied due to insufficient permissions.
    #[error("permission denied: {path} (re-run as root)")]
    PermissionDenied {
        /// Path or resource for which permission was denied.
        path: String,
    },

    /// An HTTP request for a release or asset failed.
    #[error("download of {url} failed: {reason}")]
    Download {
        /// URL that was requested.
        url: String,
        /// Transport or status error.
        reason: String,
    },

    /// A downloaded asset did not match its published digest.
    #[error("checksum mismatch for {asset}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Asset file name.
        asset: String,
        /// Digest published with the release.
        expected: String,
        /// Digest of the downloaded bytes.
        actual: String,
    },
}

impl ResourceError {
    /// Build an [`ResourceError::ExecutionFailed`] from a captured result.
    #[must_use]
    pub fn from_exec(program: &str, result: &crate::exec::ExecResult) -> Self {
        Self::ExecutionFailed {
            program: program.to_string(),
            exit_code: result.code.unwrap_or(-1),
            stderr: result.stderr.trim().to_string(),
        }
    }
}

/// Convert a write failure into a [`ResourceError`] when it is a
/// permission problem, otherwise wrap the raw I/O error with the path.
pub fn write_error(path: &Path, err: io::Error) -> anyhow::Error {
    if err.kind() == io::ErrorKind::PermissionDenied {
        ResourceError::PermissionDenied {
            path: path.display().to_string(),
        }
        .into()
    } else {
        anyhow::Error::new(err).context(format!("writing {}", path.display()))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::exec::ExecResult;

    #[test]
    fn execution_failed_display() {
        let e = ResourceError::ExecutionFailed {
            program: "apt-get".to_string(),
            exit_code: 100,
            stderr: "Unable to locate package foo".to_string(),
        };
        assert!(e.to_string().contains("apt-get"));
        assert!(e.to_string().contains("exit 100"));
        assert!(e.to_string().contains("Unable to locate package foo"));
    }

    #[test]
    fn from_exec_uses_code_and_trimmed_stderr() {
        let result = ExecResult {
            stdout: String::new(),
            stderr: "  E: boom \n".to_string(),
            success: false,
            code: None,
        };
        let e = ResourceError::from_exec("dnf", &result);
        assert_eq!(e.to_string(), "command 'dnf' failed (exit -1): E: boom");
    }

    #[test]
    fn not_found_display() {
        let e = ResourceError::NotFound {
            resource: "asset matching 'linux-x86_64'".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "resource not found: asset matching 'linux-x86_64'"
        );
    }

    #[test]
    fn checksum_mismatch_display() {
        let e = ResourceError::ChecksumMismatch {
            asset: "tool.tar.gz".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "checksum mismatch for tool.tar.gz: expected aa, got bb"
        );
    }

    #[test]
    fn write_error_maps_permission_denied() {
        let err = write_error(
            Path::new("/etc/ssh/sshd_config"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("re-run as root"));
        assert!(err.downcast_ref::<ResourceError>().is_some());
    }

    #[test]
    fn write_error_keeps_other_io_errors() {
        let err = write_error(
            Path::new("/tmp/x"),
            io::Error::other("disk full"),
        );
        assert!(err.to_string().contains("writing /tmp/x"));
        assert!(err.downcast_ref::<ResourceError>().is_none());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn resource_error_is_send_sync() {
        assert_send_sync::<ResourceError>();
    }
}
