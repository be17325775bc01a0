//! Unified Error Model
//!
//! Messages carry a category prefix (`EULA/`, `DEVICE/`, ...) so a caller can
//! route on the kind without matching the enum.
use std::fmt;
use thiserror::Error;

/// Marker the appliance puts in removal errors for a missing file
const NO_SUCH_FILE: &str = "No such file or directory";

/// Failure reported by the device transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("No such file or directory: {path}")]
    NoSuchFile { path: String },

    #[error("command failed: {0}")]
    Command(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

impl GatewayError {
    /// True for a missing-file error, whether typed or forwarded as text
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoSuchFile { .. } => true,
            Self::Command(msg) | Self::Transport(msg) => msg.contains(NO_SUCH_FILE),
        }
    }
}

/// Terminal failures of the activation negotiation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("ACTIVATION/Email must be provided")]
    EmailRequired,

    #[error("ACTIVATION/Contact info must be provided")]
    ContactInfoRequired,

    #[error("ACTIVATION/{}", fault_message(.code, .text))]
    RemoteFault {
        code: Option<i64>,
        text: Option<String>,
    },

    #[error("ACTIVATION/could not build request envelope: {0}")]
    Envelope(String),

    #[error(
        "ACTIVATION/Failed to generate license from F5 activation servers after {attempts} attempts{}",
        last_failure_suffix(.last_failure)
    )]
    NegotiationExhausted {
        attempts: u32,
        last_failure: Option<String>,
    },
}

fn fault_message(code: &Option<i64>, text: &Option<String>) -> String {
    match (code, text) {
        (Some(code), Some(text)) => format!("license server fault {}: {}", code, text),
        (None, Some(text)) => text.clone(),
        (Some(code), None) => format!("license server fault {}", code),
        (None, None) => "license server returned an unrecognized response".to_string(),
    }
}

fn last_failure_suffix(last_failure: &Option<String>) -> String {
    last_failure
        .as_ref()
        .map(|cause| format!(" (last failure: {})", cause))
        .unwrap_or_default()
}

/// Device operation that failed, for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStep {
    ReadRegistration,
    ReadDossier,
    InstallLicense,
    InstallEula,
    CommitInstall,
    Reload,
    RemoveLicense,
    RemoveEula,
}

impl fmt::Display for DeviceStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match self {
            Self::ReadRegistration => "Failed to read license registration",
            Self::ReadDossier => "Failed to read dossier from device",
            Self::InstallLicense => "Failed to install license on device",
            Self::InstallEula => "Failed to upload EULA file to device",
            Self::CommitInstall => "Failed to commit license files on device",
            Self::Reload => "Failed to reload license configuration",
            Self::RemoveLicense => "Failed to remove license from device",
            Self::RemoveEula => "Failed to remove EULA file from device",
        };
        f.write_str(text)
    }
}

/// Errors surfaced by a reconciliation run
#[derive(Error, Debug)]
pub enum LicenseError {
    #[error("INPUT/{0}")]
    InvalidInput(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("EULA/You must read and accept the product EULA to license the box.")]
    EulaNotAccepted,

    #[error("DOSSIER/Dossier not generated.")]
    DossierUnavailable,

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("DEVICE/{step}: {source}")]
    Device { step: DeviceStep, source: GatewayError },

    #[error("VERIFY/Failed to license the device.")]
    LicenseApplyFailed,

    #[error("VERIFY/Failed to remove the license from the device.")]
    LicenseRemoveFailed,

    #[error("TIMEOUT/management process did not settle after {checks} checks in {waited_ms}ms")]
    ConvergenceTimeout { checks: u32, waited_ms: u64 },
}

impl LicenseError {
    pub fn device(step: DeviceStep) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Device { step, source }
    }
}
