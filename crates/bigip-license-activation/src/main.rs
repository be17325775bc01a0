//! Binary entrypoint: negotiate one license for a dossier read from stdin.
//!
//! ```text
//! bigip-activate <REGISTRATION_KEY> < dossier.txt > artifact.json
//! ```
use std::io::Read;

use anyhow::{bail, Context, Result};

use bigip_license_activation::{ActivationClient, ActivationConfig, LicenseNegotiator};
use bigip_license_core::telemetry::init_tracing;
use bigip_license_core::{Dossier, LicenseRequest, DEFAULT_LICENSE_SERVER};

fn load_config() -> Result<ActivationConfig> {
    match std::env::var("BIGIP_PROFILE") {
        Ok(path) => Ok(ActivationConfig::load_profile(path)?),
        Err(_) => Ok(ActivationConfig::default()),
    }
}

fn eula_accepted() -> bool {
    std::env::var("BIGIP_ACCEPT_EULA")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn main() -> Result<()> {
    init_tracing();

    let Some(key) = std::env::args().nth(1) else {
        bail!("usage: bigip-activate <REGISTRATION_KEY> < dossier");
    };
    if !eula_accepted() {
        bail!("EULA/set BIGIP_ACCEPT_EULA=true to accept the F5 end user license agreement");
    }

    let server =
        std::env::var("BIGIP_LICENSE_SERVER").unwrap_or_else(|_| DEFAULT_LICENSE_SERVER.to_string());
    let request = LicenseRequest::new(key).with_server(server).accept_eula(true);

    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw).context("reading dossier from stdin")?;
    let dossier = Dossier::new(raw).context("DOSSIER/empty dossier on stdin")?;

    let config = load_config()?;
    let client = ActivationClient::from_config(&config)?;
    let artifact = client.negotiate(&request, &dossier)?;

    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}
