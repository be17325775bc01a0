//! One negotiation round and the state carried between rounds
use bigip_license_core::ActivationError;
use bigip_license_wire::{LicenseArtifact, NegotiationOutcome, ParseError};

use crate::transport::TransportError;

/// Failure worth another attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientFailure {
    Transport(TransportError),
    Unreadable(ParseError),
    /// Well-formed response missing what its state promised
    Incomplete(String),
}

impl std::fmt::Display for TransientFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::Unreadable(e) => write!(f, "{}", e),
            Self::Incomplete(reason) => write!(f, "incomplete response: {}", reason),
        }
    }
}

/// What a single round trip produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Outcome(NegotiationOutcome),
    Transient(TransientFailure),
}

impl From<Result<NegotiationOutcome, ParseError>> for AttemptResult {
    fn from(parsed: Result<NegotiationOutcome, ParseError>) -> Self {
        match parsed {
            Ok(outcome) => Self::Outcome(outcome),
            Err(e) => Self::Transient(TransientFailure::Unreadable(e)),
        }
    }
}

/// Accumulator threaded through the retry loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationState {
    /// EULA text to send; empty until the authority asks for acceptance
    pub eula: String,
    pub attempts: u32,
    pub last_failure: Option<String>,
}

/// Where the loop goes after an attempt
#[derive(Debug)]
pub enum Step {
    Done(LicenseArtifact),
    Retry(NegotiationState),
    Abort(ActivationError),
}

impl NegotiationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_attempt(self) -> Self {
        Self {
            attempts: self.attempts + 1,
            ..self
        }
    }

    /// Decides the next step from this state and one attempt result
    pub fn resolve(self, attempt: AttemptResult) -> Step {
        let failure = match attempt {
            AttemptResult::Transient(failure) => failure,
            AttemptResult::Outcome(NegotiationOutcome::Malformed { reason }) => {
                TransientFailure::Incomplete(reason)
            }
            AttemptResult::Outcome(NegotiationOutcome::EulaRequired { eula_text }) => {
                return Step::Retry(Self {
                    eula: eula_text,
                    last_failure: None,
                    ..self
                })
            }
            AttemptResult::Outcome(NegotiationOutcome::LicenseReturned {
                license_text,
                eula_text,
            }) => {
                // a response without its own EULA installs the negotiated one
                let eula = eula_text.unwrap_or(self.eula);
                return Step::Done(LicenseArtifact::new(license_text, eula));
            }
            AttemptResult::Outcome(NegotiationOutcome::EmailRequired) => {
                return Step::Abort(ActivationError::EmailRequired)
            }
            AttemptResult::Outcome(NegotiationOutcome::ContactInfoRequired) => {
                return Step::Abort(ActivationError::ContactInfoRequired)
            }
            AttemptResult::Outcome(NegotiationOutcome::Fault { code, text }) => {
                return Step::Abort(ActivationError::RemoteFault { code, text })
            }
        };

        Step::Retry(Self {
            last_failure: Some(failure.to_string()),
            ..self
        })
    }

    pub fn exhausted(self) -> ActivationError {
        ActivationError::NegotiationExhausted {
            attempts: self.attempts,
            last_failure: self.last_failure,
        }
    }
}
