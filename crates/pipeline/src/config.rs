//! Pipeline configuration loaded from environment variables.
//!
//! All fields have sensible defaults suitable for local development.
//! Debug behavior is an explicit field here, passed into the
//! orchestrator at construction — never read from ambient state.

use panelworks_core::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_MS};

/// Metadata polling schedule for background remote jobs.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first poll, in milliseconds.
    pub base_delay_ms: u64,
    /// Linear growth added per completed poll, in milliseconds.
    pub step_ms: u64,
    /// Hard cap on poll iterations; reaching it is a terminal timeout.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 3_000,
            step_ms: 500,
            max_attempts: 30,
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Try the local path before the remote one (default: `true`).
    pub prefer_client_side: bool,
    /// Attach detection overlays to completion events for debugging.
    pub debug_mode: bool,
    /// Per-request timeout for provider calls, in milliseconds.
    pub request_timeout_ms: u64,
    /// Attempt ceiling for retried provider calls.
    pub max_attempts: u32,
    /// Background-job polling schedule.
    pub poll: PollConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefer_client_side: true,
            debug_mode: false,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            poll: PollConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default  |
    /// |-------------------------|----------|
    /// | `PREFER_CLIENT_SIDE`    | `true`   |
    /// | `PIPELINE_DEBUG`        | `false`  |
    /// | `REQUEST_TIMEOUT_MS`    | `15000`  |
    /// | `REQUEST_MAX_ATTEMPTS`  | `3`      |
    /// | `POLL_BASE_DELAY_MS`    | `3000`   |
    /// | `POLL_STEP_MS`          | `500`    |
    /// | `POLL_MAX_ATTEMPTS`     | `30`     |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            prefer_client_side: env_bool("PREFER_CLIENT_SIDE", defaults.prefer_client_side),
            debug_mode: env_bool("PIPELINE_DEBUG", defaults.debug_mode),
            request_timeout_ms: env_parsed("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            max_attempts: env_parsed("REQUEST_MAX_ATTEMPTS", defaults.max_attempts),
            poll: PollConfig {
                base_delay_ms: env_parsed("POLL_BASE_DELAY_MS", defaults.poll.base_delay_ms),
                step_ms: env_parsed("POLL_STEP_MS", defaults.poll.step_ms),
                max_attempts: env_parsed("POLL_MAX_ATTEMPTS", defaults.poll.max_attempts),
            },
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_processing_contract() {
        let config = PipelineConfig::default();
        assert!(config.prefer_client_side);
        assert!(!config.debug_mode);
        assert_eq!(config.request_timeout_ms, 15_000);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.poll.base_delay_ms, 3_000);
        assert_eq!(config.poll.step_ms, 500);
        assert_eq!(config.poll.max_attempts, 30);
    }
}
