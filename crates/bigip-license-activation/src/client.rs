//! Activation client: bounded negotiation loop against the license server
use bigip_license_core::{ActivationError, Dossier, LicenseRequest};
use bigip_license_wire::{render_envelope, LicenseArtifact, ResponseParser};
use tracing::{debug, info, warn};

use crate::attempt::{AttemptResult, NegotiationState, Step, TransientFailure};
use crate::config::ActivationConfig;
use crate::transport::{ActivationTransport, HttpTransport, TransportError};

/// Anything that can turn a request and dossier into a license
pub trait LicenseNegotiator {
    fn negotiate(
        &self,
        request: &LicenseRequest,
        dossier: &Dossier,
    ) -> Result<LicenseArtifact, ActivationError>;
}

impl<N: LicenseNegotiator + ?Sized> LicenseNegotiator for &N {
    fn negotiate(
        &self,
        request: &LicenseRequest,
        dossier: &Dossier,
    ) -> Result<LicenseArtifact, ActivationError> {
        (**self).negotiate(request, dossier)
    }
}

pub struct ActivationClient<T> {
    transport: T,
    max_attempts: u32,
}

impl ActivationClient<HttpTransport> {
    /// Client on a real HTTP transport
    pub fn from_config(config: &ActivationConfig) -> Result<Self, TransportError> {
        Ok(Self::new(HttpTransport::new(config)?, config))
    }
}

impl<T: ActivationTransport> ActivationClient<T> {
    pub fn new(transport: T, config: &ActivationConfig) -> Self {
        Self {
            transport,
            max_attempts: config.attempts(),
        }
    }

    /// One round trip: render, post, parse
    fn attempt(
        &self,
        url: &str,
        request: &LicenseRequest,
        dossier: &Dossier,
        eula: &str,
    ) -> Result<AttemptResult, ActivationError> {
        let envelope = render_envelope(request, dossier, eula)
            .map_err(|e| ActivationError::Envelope(e.to_string()))?;

        let body = match self.transport.post(url, &envelope) {
            Ok(body) => body,
            Err(e) => return Ok(AttemptResult::Transient(TransientFailure::Transport(e))),
        };

        Ok(AttemptResult::from(ResponseParser::parse(&body)))
    }
}

impl<T: ActivationTransport> LicenseNegotiator for ActivationClient<T> {
    fn negotiate(
        &self,
        request: &LicenseRequest,
        dossier: &Dossier,
    ) -> Result<LicenseArtifact, ActivationError> {
        let url = request.activation_url();
        info!(
            server = %request.license_server,
            dossier = %dossier.fingerprint(),
            max_attempts = self.max_attempts,
            "requesting license from activation service"
        );

        let mut state = NegotiationState::new();
        while state.attempts < self.max_attempts {
            state = state.begin_attempt();
            let attempt = self.attempt(&url, request, dossier, &state.eula)?;

            match &attempt {
                AttemptResult::Outcome(outcome) => {
                    debug!(attempt = state.attempts, outcome = outcome.label(), "activation response");
                }
                AttemptResult::Transient(failure) => {
                    warn!(attempt = state.attempts, error = %failure, "activation attempt failed, retrying");
                }
            }

            let attempts = state.attempts;
            state = match state.resolve(attempt) {
                Step::Done(artifact) => {
                    info!(attempts, "license returned");
                    return Ok(artifact);
                }
                Step::Abort(err) => {
                    warn!(error = %err, "activation service refused the request");
                    return Err(err);
                }
                Step::Retry(next) => next,
            };
        }

        let err = state.exhausted();
        warn!(error = %err, "activation attempts exhausted");
        Err(err)
    }
}
