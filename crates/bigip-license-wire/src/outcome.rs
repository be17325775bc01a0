//! Negotiation outcomes and the license artifact they can resolve to
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::parser::ParsedResponse;

/// Transaction states the activation service reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    EulaRequired,
    LicenseReturned,
    EmailRequired,
    ContactInfoRequired,
}

impl FromStr for TransactionState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EULA_REQUIRED" => Ok(Self::EulaRequired),
            "LICENSE_RETURNED" => Ok(Self::LicenseReturned),
            "EMAIL_REQUIRED" => Ok(Self::EmailRequired),
            "CONTACT_INFO_REQUIRED" => Ok(Self::ContactInfoRequired),
            _ => Err(()),
        }
    }
}

/// What one response means for the negotiation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NegotiationOutcome {
    /// Resubmit with this EULA text
    EulaRequired { eula_text: String },
    LicenseReturned {
        license_text: String,
        eula_text: Option<String>,
    },
    EmailRequired,
    ContactInfoRequired,
    /// Explicit fault, or a state the client does not know
    Fault {
        code: Option<i64>,
        text: Option<String>,
    },
    /// Well-formed XML that does not carry what its state promises
    Malformed { reason: String },
}

impl From<&ParsedResponse> for NegotiationOutcome {
    fn from(response: &ParsedResponse) -> Self {
        let state = response.state.as_deref().and_then(|s| s.parse().ok());
        match state {
            Some(TransactionState::EulaRequired) => match &response.eula {
                Some(eula) => Self::EulaRequired {
                    eula_text: eula.clone(),
                },
                None => Self::Malformed {
                    reason: "EULA_REQUIRED without EULA text".to_string(),
                },
            },
            Some(TransactionState::LicenseReturned) => match &response.license {
                Some(license) => Self::LicenseReturned {
                    license_text: license.clone(),
                    eula_text: response.eula.clone(),
                },
                None => Self::Malformed {
                    reason: "LICENSE_RETURNED without license text".to_string(),
                },
            },
            Some(TransactionState::EmailRequired) => Self::EmailRequired,
            Some(TransactionState::ContactInfoRequired) => Self::ContactInfoRequired,
            None => Self::Fault {
                code: response.fault_number,
                text: response.fault_text.clone(),
            },
        }
    }
}

impl NegotiationOutcome {
    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::EulaRequired { .. } => "EULA_REQUIRED",
            Self::LicenseReturned { .. } => "LICENSE_RETURNED",
            Self::EmailRequired => "EMAIL_REQUIRED",
            Self::ContactInfoRequired => "CONTACT_INFO_REQUIRED",
            Self::Fault { .. } => "FAULT",
            Self::Malformed { .. } => "MALFORMED",
        }
    }
}

/// License and EULA text to install on the appliance.
///
/// Only a `LicenseReturned` outcome can produce one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseArtifact {
    license_text: String,
    eula_text: String,
}

impl LicenseArtifact {
    pub fn new(license_text: impl Into<String>, eula_text: impl Into<String>) -> Self {
        Self {
            license_text: license_text.into(),
            eula_text: eula_text.into(),
        }
    }

    pub fn license_text(&self) -> &str {
        &self.license_text
    }

    pub fn eula_text(&self) -> &str {
        &self.eula_text
    }
}
