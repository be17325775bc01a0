//! Convergence Controller: drives the appliance to the desired license state
//!
//! ```text
//! ensure_present: Check → EULA gate → Dossier → Negotiate → Install → Reload → Poll → Verify
//! ensure_absent:  Check → Remove → Reload → Poll → Verify
//! ```
//!
//! Check mode stops after the EULA gate (present) or the check (absent) and
//! reports what would change.

use bigip_license_activation::{ActivationClient, HttpTransport, LicenseNegotiator};
use bigip_license_core::{
    DeviceCommand, DeviceGateway, DeviceStep, Dossier, ExecutionContext, LicenseError,
    LicenseRequest,
};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::install::LicenseInstaller;
use crate::poller::StabilityPoller;
use crate::profile::ReconcilerProfile;

pub struct ConvergenceController<G, N, C> {
    gateway: G,
    negotiator: N,
    installer: LicenseInstaller,
    poller: StabilityPoller<C>,
}

impl<G: DeviceGateway> ConvergenceController<G, ActivationClient<HttpTransport>, SystemClock> {
    /// Production wiring: HTTP activation client and wall clock
    pub fn from_profile(gateway: G, profile: &ReconcilerProfile) -> Result<Self, LicenseError> {
        let negotiator = ActivationClient::from_config(&profile.activation)
            .map_err(|e| LicenseError::Config(e.to_string()))?;
        Ok(Self::new(
            gateway,
            negotiator,
            LicenseInstaller::new(profile.paths.clone()),
            StabilityPoller::new(profile.polling.clone(), SystemClock::new()),
        ))
    }
}

impl<G, N, C> ConvergenceController<G, N, C>
where
    G: DeviceGateway,
    N: LicenseNegotiator,
    C: Clock,
{
    pub fn new(
        gateway: G,
        negotiator: N,
        installer: LicenseInstaller,
        poller: StabilityPoller<C>,
    ) -> Self {
        Self {
            gateway,
            negotiator,
            installer,
            poller,
        }
    }

    /// Licenses the appliance with `request.license_key`. Returns whether it changed.
    pub fn ensure_present(
        &mut self,
        request: &LicenseRequest,
        ctx: &ExecutionContext,
    ) -> Result<bool, LicenseError> {
        let current = self.registration()?;
        if current.as_deref() == Some(request.license_key.as_str()) {
            info!("appliance already licensed with requested key");
            return Ok(false);
        }

        if !request.accept_eula {
            return Err(LicenseError::EulaNotAccepted);
        }
        if ctx.check_mode {
            info!("check mode: appliance would be licensed");
            return Ok(true);
        }

        let dossier = self.read_dossier(&request.license_key)?;
        info!(dossier = %dossier.fingerprint(), "dossier retrieved");

        let artifact = self.negotiator.negotiate(request, &dossier)?;

        self.installer.install(&mut self.gateway, &artifact)?;
        self.installer.reload(&mut self.gateway)?;
        self.poller.wait_until_stable(&mut self.gateway)?;

        if self.registration()?.as_deref() != Some(request.license_key.as_str()) {
            return Err(LicenseError::LicenseApplyFailed);
        }
        info!("license applied");
        Ok(true)
    }

    /// Removes any license from the appliance. Returns whether it changed.
    pub fn ensure_absent(&mut self, ctx: &ExecutionContext) -> Result<bool, LicenseError> {
        if self.registration()?.is_none() {
            info!("appliance has no license");
            return Ok(false);
        }
        if ctx.check_mode {
            info!("check mode: license would be removed");
            return Ok(true);
        }

        self.installer.remove(&mut self.gateway)?;
        self.installer.reload(&mut self.gateway)?;
        self.poller.wait_until_stable(&mut self.gateway)?;

        if self.registration()?.is_some() {
            return Err(LicenseError::LicenseRemoveFailed);
        }
        info!("license removed");
        Ok(true)
    }

    fn registration(&mut self) -> Result<Option<String>, LicenseError> {
        let key = self
            .gateway
            .registration_key()
            .map_err(LicenseError::device(DeviceStep::ReadRegistration))?;
        debug!(registered = key.is_some(), "registration read");
        Ok(key.filter(|k| !k.trim().is_empty()))
    }

    fn read_dossier(&mut self, registration_key: &str) -> Result<Dossier, LicenseError> {
        let output = self
            .gateway
            .run_command(&DeviceCommand::GetDossier {
                registration_key: registration_key.to_string(),
            })
            .map_err(LicenseError::device(DeviceStep::ReadDossier))?;
        output
            .command_result
            .and_then(Dossier::new)
            .ok_or(LicenseError::DossierUnavailable)
    }
}
