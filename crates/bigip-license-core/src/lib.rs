//! BIG-IP License Core: data model, device gateway contract and error model
//!
//! Shared vocabulary for the license reconciler. The wire, activation and
//! converge crates all build on the types defined here.
//!
//! # Flow
//!
//! ```text
//! ModuleParams → LicenseRequest → (DeviceGateway: dossier) → activation → install → verify
//!                                        ↑                                    ↓
//!                                        └──────────── reload / poll ─────────┘
//! ```

pub mod context;
pub mod data_model;
pub mod error;
pub mod gateway;
pub mod mock;
pub mod telemetry;

pub use context::ExecutionContext;
pub use data_model::{
    ContactInfo, DesiredState, Dossier, LicenseRequest, ModuleParams, ReconciliationResult,
    DEFAULT_LICENSE_SERVER,
};
pub use error::{ActivationError, DeviceStep, GatewayError, LicenseError};
pub use gateway::{CommandOutput, DeviceCommand, DeviceGateway};
pub use mock::MockGateway;

/// Path of the SOAP activation service on the license server
pub const ACTIVATION_SERVICE_PATH: &str =
    "/license/services/urn:com.f5.license.v5b.ActivationService";
