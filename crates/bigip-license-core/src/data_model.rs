//! Data Model: LicenseRequest, Dossier, ModuleParams, ReconciliationResult
use crate::error::LicenseError;
use crate::ACTIVATION_SERVICE_PATH;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// License server used when the caller does not name one
pub const DEFAULT_LICENSE_SERVER: &str = "activate.f5.com";

fn default_license_server() -> String {
    DEFAULT_LICENSE_SERVER.to_string()
}

/// Contact details the activation authority may ask for.
///
/// Every field defaults to the empty string, which is also what goes on the
/// wire when a field is not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub phone: String,
    pub job_title: String,
    pub address: String,
    pub city: String,
    /// State or province; `state` on the module is the desired state
    pub state_province: String,
    pub postal_code: String,
    pub country: String,
}

/// Desired-state input for a present reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRequest {
    /// Registration key (ex: "XXXXX-XXXXX-XXXXX-XXXXX-XXXXXXX")
    pub license_key: String,
    /// Activation authority host
    #[serde(default = "default_license_server")]
    pub license_server: String,
    /// Caller has read and accepted the product EULA
    #[serde(default)]
    pub accept_eula: bool,
    #[serde(default)]
    pub contact: ContactInfo,
}

impl LicenseRequest {
    pub fn new(license_key: impl Into<String>) -> Self {
        Self {
            license_key: license_key.into(),
            license_server: default_license_server(),
            accept_eula: false,
            contact: ContactInfo::default(),
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.license_server = server.into();
        self
    }

    pub fn accept_eula(mut self, accepted: bool) -> Self {
        self.accept_eula = accepted;
        self
    }

    pub fn with_contact(mut self, contact: ContactInfo) -> Self {
        self.contact = contact;
        self
    }

    /// Endpoint of the SOAP activation service on the configured server
    pub fn activation_url(&self) -> String {
        format!("https://{}{}", self.license_server, ACTIVATION_SERVICE_PATH)
    }
}

/// Appliance identity token handed to the activation authority
#[derive(Clone, PartialEq, Eq)]
pub struct Dossier(String);

impl Dossier {
    /// Wraps a raw command result; blank output is not a dossier
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short content hash used in logs instead of the token itself
    pub fn fingerprint(&self) -> String {
        let hash = blake3::hash(self.0.as_bytes()).to_hex();
        format!("blake3:{}", &hash[..16])
    }
}

impl fmt::Debug for Dossier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Dossier").field(&self.fingerprint()).finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

impl FromStr for DesiredState {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(LicenseError::InvalidInput(format!(
                "state must be one of present, absent (got '{}')",
                other
            ))),
        }
    }
}

/// Raw module inputs, as an orchestrator hands them over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleParams {
    #[serde(default)]
    pub license_key: Option<String>,
    #[serde(default = "default_license_server")]
    pub license_server: String,
    #[serde(default)]
    pub state: DesiredState,
    #[serde(default)]
    pub accept_eula: bool,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            license_key: None,
            license_server: default_license_server(),
            state: DesiredState::Present,
            accept_eula: false,
            contact: ContactInfo::default(),
        }
    }
}

impl ModuleParams {
    pub fn from_yaml(yaml: &str) -> Result<Self, LicenseError> {
        serde_yaml::from_str(yaml).map_err(|e| LicenseError::InvalidInput(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, LicenseError> {
        serde_json::from_str(json).map_err(|e| LicenseError::InvalidInput(e.to_string()))
    }

    /// `state: present` needs a registration key; absent ignores it
    pub fn validate(&self) -> Result<(), LicenseError> {
        if self.state == DesiredState::Present && self.license_key().is_none() {
            return Err(LicenseError::InvalidInput(
                "state is present but all of the following are missing: license_key".to_string(),
            ));
        }
        if self.license_server.trim().is_empty() {
            return Err(LicenseError::InvalidInput(
                "license_server must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn license_key(&self) -> Option<&str> {
        self.license_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Validated request; for absent the key may be empty
    pub fn license_request(&self) -> Result<LicenseRequest, LicenseError> {
        self.validate()?;
        Ok(LicenseRequest {
            license_key: self.license_key().unwrap_or_default().to_string(),
            license_server: self.license_server.trim().to_string(),
            accept_eula: self.accept_eula,
            contact: self.contact.clone(),
        })
    }
}

/// Outcome of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub changed: bool,
    /// Reportable attributes; the license resource exposes none today
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl ReconciliationResult {
    pub fn new(changed: bool) -> Self {
        Self {
            changed,
            attributes: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_activation_url() {
        let request = LicenseRequest::new("KEY").with_server("license.example.net");
        assert_eq!(
            request.activation_url(),
            "https://license.example.net/license/services/urn:com.f5.license.v5b.ActivationService"
        );
        assert_eq!(LicenseRequest::new("KEY").license_server, "activate.f5.com");
    }

    #[test]
    fn test_blank_dossier_rejected() {
        assert!(Dossier::new("").is_none());
        assert!(Dossier::new("  \n").is_none());
        assert_eq!(Dossier::new(" abc\n").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_dossier_debug_hides_token() {
        let dossier = Dossier::new("secret-dossier-token").unwrap();
        let shown = format!("{:?}", dossier);
        assert!(!shown.contains("secret-dossier-token"));
        assert!(shown.contains("blake3:"));
    }

    #[test]
    fn test_module_params_defaults() {
        let params = ModuleParams::from_yaml("license_key: ABC-123\n").unwrap();
        assert_eq!(params.state, DesiredState::Present);
        assert_eq!(params.license_server, DEFAULT_LICENSE_SERVER);
        assert!(!params.accept_eula);
        assert_eq!(params.contact, ContactInfo::default());
    }

    #[test]
    fn test_module_params_flattened_contact() {
        let params = ModuleParams::from_yaml(
            "license_key: ABC-123\naccept_eula: true\nemail: ops@example.com\ncountry: NL\nstate_province: ZH\n",
        )
        .unwrap();
        let request = params.license_request().unwrap();
        assert!(request.accept_eula);
        assert_eq!(params.state, DesiredState::Present);
        assert_eq!(request.contact.state_province, "ZH");
        assert_eq!(request.contact.email, "ops@example.com");
        assert_eq!(request.contact.country, "NL");
        assert_eq!(request.contact.phone, "");
    }

    #[test]
    fn test_present_requires_license_key() {
        let params = ModuleParams::default();
        assert!(matches!(params.validate(), Err(LicenseError::InvalidInput(_))));

        let params = ModuleParams {
            license_key: Some("  ".into()),
            ..ModuleParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_absent_ignores_license_key() {
        let params = ModuleParams::from_yaml("state: absent\n").unwrap();
        let request = params.license_request().unwrap();
        assert_eq!(request.license_key, "");
    }

    #[test]
    fn test_desired_state_parse() {
        assert_eq!("Absent".parse::<DesiredState>().unwrap(), DesiredState::Absent);
        assert!("latest".parse::<DesiredState>().is_err());
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = ReconciliationResult::new(true);
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({ "changed": true }));
    }
}
