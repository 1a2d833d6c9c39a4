//! Harness configuration
//!
//! Configuration is an explicit value handed to each scenario run. Defaults
//! target the public placeholder users endpoint; `RESTCHECK_*` environment
//! variables override them.

use crate::context::parse_absolute_uri;
use crate::endpoints;
use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_BASE_URI: &str = "RESTCHECK_BASE_URI";
pub const ENV_USERS_PATH: &str = "RESTCHECK_USERS_PATH";
pub const ENV_TIMEOUT_MS: &str = "RESTCHECK_TIMEOUT_MS";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Absolute base URI, without a trailing path for the resource
    pub base_uri: String,
    /// Path of the users resource appended to `base_uri`
    pub users_path: String,
    /// Upper bound on a single request, body included
    pub timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            base_uri: endpoints::PLACEHOLDER_BASE_URI.to_string(),
            users_path: endpoints::USERS_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl HarnessConfig {
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_uri) = lookup(ENV_BASE_URI) {
            parse_absolute_uri(&base_uri).map_err(|reason| HarnessError::InvalidConfig {
                reason: format!("{ENV_BASE_URI}={base_uri}: {reason}"),
            })?;
            config.base_uri = base_uri;
        }

        if let Some(users_path) = lookup(ENV_USERS_PATH) {
            if !users_path.starts_with('/') {
                return Err(HarnessError::InvalidConfig {
                    reason: format!("{ENV_USERS_PATH} must start with '/', got '{users_path}'"),
                });
            }
            config.users_path = users_path;
        }

        if let Some(timeout_ms) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = timeout_ms
                .trim()
                .parse()
                .map_err(|e| HarnessError::InvalidConfig {
                    reason: format!("{ENV_TIMEOUT_MS}={timeout_ms}: {e}"),
                })?;
            if millis == 0 {
                return Err(HarnessError::InvalidConfig {
                    reason: format!("{ENV_TIMEOUT_MS} must be greater than zero"),
                });
            }
            config.timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }

    /// Absolute URI of the users resource.
    pub fn users_endpoint(&self) -> String {
        format!("{}{}", self.base_uri.trim_end_matches('/'), self.users_path)
    }
}
