//! BIG-IP License Converge: reconciles an appliance's license with the desired state
//!
//! [`reconcile`] validates module parameters and dispatches to
//! [`ConvergenceController::ensure_present`] or
//! [`ConvergenceController::ensure_absent`]. Every run is wrapped in a
//! tracing span carrying the context's trace id.

pub mod clock;
pub mod controller;
pub mod install;
pub mod poller;
pub mod profile;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::ConvergenceController;
pub use install::LicenseInstaller;
pub use poller::StabilityPoller;
pub use profile::{DevicePaths, PollingConfig, ProfileError, ReconcilerProfile};

use bigip_license_activation::LicenseNegotiator;
use bigip_license_core::{
    DesiredState, DeviceGateway, ExecutionContext, LicenseError, ModuleParams,
    ReconciliationResult,
};
use tracing::info;

/// Runs one reconciliation of `params` against the controller's appliance
pub fn reconcile<G, N, C>(
    params: &ModuleParams,
    ctx: &ExecutionContext,
    controller: &mut ConvergenceController<G, N, C>,
) -> Result<ReconciliationResult, LicenseError>
where
    G: DeviceGateway,
    N: LicenseNegotiator,
    C: Clock,
{
    let span = ctx.span("license");
    let _guard = span.enter();

    let request = params.license_request()?;
    info!(state = ?params.state, server = %request.license_server, "reconciling license");

    let changed = match params.state {
        DesiredState::Present => controller.ensure_present(&request, ctx)?,
        DesiredState::Absent => controller.ensure_absent(ctx)?,
    };

    info!(changed, "reconciliation finished");
    Ok(ReconciliationResult::new(changed))
}
