//! License file installation and removal on the appliance.
//!
//! Installs stage both files next to their live paths and then move them into
//! place, EULA first. A failed write leaves the live files untouched; a commit
//! that stops halfway can only leave a new EULA beside the old license, which
//! keeps the old registration and is redone by the next run. Removal tolerates
//! files that are already gone.

use bigip_license_core::{DeviceCommand, DeviceGateway, DeviceStep, LicenseError};
use bigip_license_wire::LicenseArtifact;
use tracing::{debug, info, warn};

use crate::profile::DevicePaths;

pub struct LicenseInstaller {
    paths: DevicePaths,
}

impl LicenseInstaller {
    pub fn new(paths: DevicePaths) -> Self {
        Self { paths }
    }

    /// Writes license and EULA to their live paths
    pub fn install<G: DeviceGateway>(
        &self,
        gateway: &mut G,
        artifact: &LicenseArtifact,
    ) -> Result<(), LicenseError> {
        let staged_license = self.paths.staged_license();
        let staged_eula = self.paths.staged_eula();

        let staged = gateway
            .write_heredoc(&staged_license, artifact.license_text())
            .map_err(LicenseError::device(DeviceStep::InstallLicense))
            .and_then(|_| {
                gateway
                    .write_heredoc(&staged_eula, artifact.eula_text())
                    .map_err(LicenseError::device(DeviceStep::InstallEula))
            });
        if let Err(e) = staged {
            self.discard_staged(gateway);
            return Err(e);
        }
        debug!(license = %staged_license, eula = %staged_eula, "license files staged");

        let commit = format!(
            "mv -f {} {} && mv -f {} {}",
            staged_eula, self.paths.eula_path, staged_license, self.paths.license_path
        );
        if let Err(e) = gateway.run_command(&DeviceCommand::bash(commit)) {
            self.discard_staged(gateway);
            return Err(LicenseError::device(DeviceStep::CommitInstall)(e));
        }

        info!(license = %self.paths.license_path, eula = %self.paths.eula_path, "license files installed");
        Ok(())
    }

    /// Deletes license and EULA; a file that is already gone counts as removed
    pub fn remove<G: DeviceGateway>(&self, gateway: &mut G) -> Result<(), LicenseError> {
        remove_file(gateway, &self.paths.license_path, DeviceStep::RemoveLicense)?;
        remove_file(gateway, &self.paths.eula_path, DeviceStep::RemoveEula)?;
        info!("license files removed");
        Ok(())
    }

    pub fn reload<G: DeviceGateway>(&self, gateway: &mut G) -> Result<(), LicenseError> {
        gateway
            .run_command(&DeviceCommand::reload_license())
            .map(|_| ())
            .map_err(LicenseError::device(DeviceStep::Reload))
    }

    fn discard_staged<G: DeviceGateway>(&self, gateway: &mut G) {
        let cleanup = format!(
            "rm -f {} && rm -f {}",
            self.paths.staged_license(),
            self.paths.staged_eula()
        );
        if let Err(e) = gateway.run_command(&DeviceCommand::bash(cleanup)) {
            warn!(error = %e, "could not discard staged license files");
        }
    }
}

fn remove_file<G: DeviceGateway>(
    gateway: &mut G,
    path: &str,
    step: DeviceStep,
) -> Result<(), LicenseError> {
    let command = DeviceCommand::UnixRm {
        path: path.to_string(),
    };
    match gateway.run_command(&command) {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!(path, "already absent");
            Ok(())
        }
        Err(e) => Err(LicenseError::device(step)(e)),
    }
}
