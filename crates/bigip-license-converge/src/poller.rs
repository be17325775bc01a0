//! Stability poller: waits for the management process to settle after a reload
//!
//! A single positive readiness reading is not trusted. The poller needs
//! `threshold` consecutive positives; an error or a negative reading resets
//! the count. The whole loop is bounded by `max_wait`.

use std::time::Duration;

use bigip_license_core::{DeviceCommand, DeviceGateway, GatewayError, LicenseError};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::profile::PollingConfig;

/// Marker the readiness check prints once mcpd is up
const READY_MARKER: &str = "running";

pub struct StabilityPoller<C> {
    config: PollingConfig,
    clock: C,
}

impl<C: Clock> StabilityPoller<C> {
    pub fn new(config: PollingConfig, clock: C) -> Self {
        Self { config, clock }
    }

    /// Blocks until the appliance reports ready `threshold` times in a row.
    /// Returns the number of checks performed.
    pub fn wait_until_stable<G: DeviceGateway>(&self, gateway: &mut G) -> Result<u32, LicenseError> {
        let threshold = self.config.threshold.max(1);
        let started = self.clock.elapsed();
        let max_wait = self.config.max_wait();

        self.clock.sleep(self.config.warmup());

        let mut checks = 0u32;
        let mut consecutive = 0u32;
        loop {
            checks += 1;
            match check_ready(gateway) {
                Ok(true) => consecutive += 1,
                Ok(false) => consecutive = 0,
                Err(e) => {
                    debug!(check = checks, error = %e, "readiness check failed");
                    consecutive = 0;
                }
            }
            debug!(check = checks, consecutive, threshold, "readiness check");

            if consecutive >= threshold {
                info!(checks, "management process settled");
                return Ok(checks);
            }

            let waited = self.clock.elapsed().saturating_sub(started);
            if waited + self.config.interval() > max_wait {
                let waited_ms = duration_ms(waited);
                warn!(checks, waited_ms, "management process did not settle");
                return Err(LicenseError::ConvergenceTimeout { checks, waited_ms });
            }
            self.clock.sleep(self.config.interval());
        }
    }
}

fn check_ready<G: DeviceGateway>(gateway: &mut G) -> Result<bool, GatewayError> {
    let output = gateway.run_command(&DeviceCommand::readiness_check())?;
    Ok(output
        .command_result
        .map(|result| result.contains(READY_MARKER))
        .unwrap_or(false))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
