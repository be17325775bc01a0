//! Reconciler profile: activation, polling and device path settings
//!
//! Every section and field has a default, so an empty YAML document is a
//! valid profile.

use std::path::Path;
use std::time::Duration;

use bigip_license_activation::ActivationConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("cannot read profile {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid profile: {0}")]
    Parse(String),
}

/// Stability polling after a reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Sleep before the first readiness check
    pub warmup_ms: u64,

    /// Sleep between checks
    pub interval_ms: u64,

    /// Consecutive positive checks required
    pub threshold: u32,

    /// Upper bound on the whole loop, warm-up included
    pub max_wait_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 5_000,
            interval_ms: 5_000,
            threshold: 4,
            max_wait_ms: 600_000,
        }
    }
}

impl PollingConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

/// Where the license and EULA live on the appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicePaths {
    pub license_path: String,
    pub eula_path: String,
}

impl Default for DevicePaths {
    fn default() -> Self {
        Self {
            license_path: "/config/bigip.license".to_string(),
            eula_path: "/LICENSE.F5".to_string(),
        }
    }
}

impl DevicePaths {
    pub fn staged_license(&self) -> String {
        staged(&self.license_path)
    }

    pub fn staged_eula(&self) -> String {
        staged(&self.eula_path)
    }
}

fn staged(path: &str) -> String {
    format!("{}.pending", path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerProfile {
    pub activation: ActivationConfig,
    pub polling: PollingConfig,
    pub paths: DevicePaths,
}

impl ReconcilerProfile {
    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, ProfileError> {
        serde_yaml::from_str(yaml).map_err(|e| ProfileError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }
}
