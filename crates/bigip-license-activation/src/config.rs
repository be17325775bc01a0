//! Activation client settings
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attempts before a negotiation is given up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read profile {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid activation settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Only the `activation` section of a reconciler profile
#[derive(Debug, Default, Deserialize)]
struct ProfileSection {
    #[serde(default)]
    activation: ActivationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    /// Round trips before `NegotiationExhausted` (EULA rounds count)
    pub max_attempts: u32,
    pub connect_timeout_ms: u64,
    /// Read and write timeout per request
    pub request_timeout_ms: u64,
    /// Skip certificate and hostname verification of the activation service
    pub accept_invalid_certs: bool,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
            accept_invalid_certs: true,
        }
    }
}

impl ActivationConfig {
    /// Reads the `activation` section of a profile document; other sections are ignored
    pub fn from_profile_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let section: Option<ProfileSection> = serde_yaml::from_str(yaml)?;
        Ok(section.unwrap_or_default().activation)
    }

    pub fn load_profile(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_profile_yaml(&raw)
    }

    /// At least one attempt is always made
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
