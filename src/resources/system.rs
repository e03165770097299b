//! systemd-backed system resources: timezone, sleep targets, service restarts.
use anyhow::Result;

use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::exec::{Executor, run_as_root};

/// Targets masked to disable suspend and hibernation.
pub const SLEEP_TARGETS: &[&str] = &[
    "sleep.target",
    "suspend.target",
    "hibernate.target",
    "hybrid-sleep.target",
];

/// System timezone managed through `timedatectl`.
#[derive(Debug)]
pub struct TimezoneResource<'a> {
    /// Desired IANA zone name, e.g. `Europe/London`.
    pub timezone: String,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> TimezoneResource<'a> {
    /// Create a new timezone resource.
    #[must_use]
    pub const fn new(timezone: String, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            timezone,
            sudo,
            executor,
        }
    }
}

impl Applicable for TimezoneResource<'_> {
    fn description(&self) -> String {
        format!("timezone {}", self.timezone)
    }

    fn apply(&self) -> Result<ResourceChange> {
        run_as_root(
            self.executor,
            self.sudo,
            "timedatectl",
            &["set-timezone", &self.timezone],
        )?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for TimezoneResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        let result = self
            .executor
            .run_unchecked("timedatectl", &["show", "-p", "Timezone", "--value"])?;
        if !result.success {
            return Ok(ResourceState::Invalid {
                reason: "timedatectl is not available".to_string(),
            });
        }
        let current = result.stdout.trim();
        if current == self.timezone {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect {
                current: current.to_string(),
            })
        }
    }
}

/// A systemd sleep target that should be masked.
#[derive(Debug)]
pub struct SleepTargetResource<'a> {
    /// Unit name, e.g. `suspend.target`.
    pub target: String,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> SleepTargetResource<'a> {
    /// Create a new sleep target resource.
    #[must_use]
    pub const fn new(target: String, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            target,
            sudo,
            executor,
        }
    }

    /// One resource per entry of [`SLEEP_TARGETS`].
    #[must_use]
    pub fn all(sudo: bool, executor: &'a dyn Executor) -> Vec<Self> {
        SLEEP_TARGETS
            .iter()
            .map(|t| Self::new((*t).to_string(), sudo, executor))
            .collect()
    }
}

impl Applicable for SleepTargetResource<'_> {
    fn description(&self) -> String {
        self.target.clone()
    }

    fn apply(&self) -> Result<ResourceChange> {
        run_as_root(self.executor, self.sudo, "systemctl", &["mask", &self.target])?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for SleepTargetResource<'_> {
    fn current_state(&self) -> Result<ResourceState> {
        // `is-enabled` exits non-zero for masked units; only stdout matters.
        let result = self
            .executor
            .run_unchecked("systemctl", &["is-enabled", &self.target])?;
        match result.stdout.trim() {
            "masked" | "masked-runtime" => Ok(ResourceState::Correct),
            "" => Ok(ResourceState::Invalid {
                reason: format!("{} is unknown to systemctl", self.target),
            }),
            other => Ok(ResourceState::Incorrect {
                current: other.to_string(),
            }),
        }
    }
}

/// Restart of a systemd service after its configuration changed.
#[derive(Debug)]
pub struct ServiceRestartResource<'a> {
    /// Service unit name, e.g. `ssh`.
    pub service: String,
    sudo: bool,
    executor: &'a dyn Executor,
}

impl<'a> ServiceRestartResource<'a> {
    /// Create a new service restart resource.
    #[must_use]
    pub const fn new(service: String, sudo: bool, executor: &'a dyn Executor) -> Self {
        Self {
            service,
            sudo,
            executor,
        }
    }
}

impl Applicable for ServiceRestartResource<'_> {
    fn description(&self) -> String {
        format!("restart {}", self.service)
    }

    fn apply(&self) -> Result<ResourceChange> {
        run_as_root(
            self.executor,
            self.sudo,
            "systemctl",
            &["restart", &self.service],
        )?;
        Ok(ResourceChange::Applied)
    }
}
