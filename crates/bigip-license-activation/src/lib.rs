//! BIG-IP License Activation: the negotiation protocol
//!
//! [`ActivationClient`] posts `getLicense` envelopes to the activation
//! service until it gets a license back, a fatal answer, or runs out of
//! attempts. Transport failures and unreadable responses are retried;
//! an EULA round trip is part of the normal flow.
//!
//! ```text
//! attempt ──▶ Outcome(EulaRequired)     ──▶ retry with EULA
//!         ──▶ Outcome(LicenseReturned)  ──▶ LicenseArtifact
//!         ──▶ Outcome(Email/Contact/Fault) ──▶ ActivationError
//!         ──▶ Transient(..)             ──▶ retry
//! ```

pub mod attempt;
pub mod client;
pub mod config;
pub mod transport;

pub use attempt::{AttemptResult, NegotiationState, Step, TransientFailure};
pub use client::{ActivationClient, LicenseNegotiator};
pub use config::{ActivationConfig, ConfigError};
pub use transport::{ActivationTransport, HttpTransport, ScriptedTransport, TransportError};
