//! Per-run configuration.

use std::time::Duration;

use crate::target::Target;

/// Interval between service status polls while waiting for an upgrade.
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default window to wait for a service to reach the upgraded state.
pub const DEFAULT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable configuration for one upgrade run, assembled at startup.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Service (and optional stack) the run operates on.
    pub target: Target,
    /// Image the service is expected to run after the upgrade. Recorded
    /// and logged; the upgrade request itself reuses the service's
    /// current launch configuration unchanged.
    pub docker_image: String,
    /// Maximum wait for the service to report the upgraded state.
    pub upgrade_timeout: Duration,
    /// Interval between status polls.
    pub poll_interval: Duration,
}

impl DeployConfig {
    /// Configuration with the default timeout and poll interval.
    pub fn new(target: Target, docker_image: impl Into<String>) -> Self {
        Self {
            target,
            docker_image: docker_image.into(),
            upgrade_timeout: DEFAULT_UPGRADE_TIMEOUT,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the upgrade timeout.
    pub fn with_upgrade_timeout(mut self, timeout: Duration) -> Self {
        self.upgrade_timeout = timeout;
        self
    }

    /// Override the poll interval (for testing).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Parse a duration flag value like `500ms`, `90s`, or `2m`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if let Some(millis) = value.strip_suffix("ms") {
        return parse_number(millis, value).map(Duration::from_millis);
    }
    if let Some(secs) = value.strip_suffix('s') {
        return parse_number(secs, value).map(Duration::from_secs);
    }
    if let Some(mins) = value.strip_suffix('m') {
        return parse_number(mins, value).map(|m| Duration::from_secs(m * 60));
    }
    parse_number(value, value).map(Duration::from_secs)
}

fn parse_number(digits: &str, original: &str) -> Result<u64, String> {
    digits
        .parse::<u64>()
        .map_err(|_| format!("invalid duration `{original}` (expected e.g. 500ms, 90s, 2m)"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
