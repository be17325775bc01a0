//! End-to-end reconciliation against a mock appliance and a scripted activation service.

use bigip_license_activation::{ActivationClient, ScriptedTransport};
use bigip_license_converge::{
    reconcile, ConvergenceController, LicenseInstaller, ManualClock, ReconcilerProfile,
    StabilityPoller,
};
use bigip_license_core::{
    DeviceCommand, ExecutionContext, LicenseError, MockGateway, ModuleParams,
};

const EULA_REQUIRED: &[u8] = include_bytes!("../../../testing/fixtures/activation/eula_required.xml");
const LICENSE_RETURNED: &[u8] =
    include_bytes!("../../../testing/fixtures/activation/license_returned.xml");
const LICENSING_FAULT: &[u8] =
    include_bytes!("../../../testing/fixtures/activation/licensing_fault.xml");

const KEY: &str = "AAAAA-BBBBB-CCCCC-DDDDD-EEEEEEE";

fn present_params() -> ModuleParams {
    ModuleParams::from_yaml(&format!(
        "license_key: {}\naccept_eula: true\nemail: netops@example.com\n",
        KEY
    ))
    .unwrap()
}

fn run(
    params: &ModuleParams,
    ctx: &ExecutionContext,
    profile: &ReconcilerProfile,
    gateway: &mut MockGateway,
    transport: &ScriptedTransport,
    clock: &ManualClock,
) -> Result<bigip_license_core::ReconciliationResult, LicenseError> {
    let mut controller = ConvergenceController::new(
        gateway,
        ActivationClient::new(transport, &profile.activation),
        LicenseInstaller::new(profile.paths.clone()),
        StabilityPoller::new(profile.polling.clone(), clock),
    );
    reconcile(params, ctx, &mut controller)
}

// =============================================================================
// state: present
// =============================================================================

#[test]
fn test_present_negotiates_installs_and_verifies() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![
        Ok(EULA_REQUIRED.to_vec()),
        Ok(LICENSE_RETURNED.to_vec()),
    ]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new()
        .with_dossier("5c0ffee1d0551e4")
        .on_reload(Some(KEY));

    let result = run(
        &present_params(),
        &ExecutionContext::new(),
        &profile,
        &mut gateway,
        &transport,
        &clock,
    )
    .unwrap();

    assert!(result.changed);
    assert_eq!(serde_json::to_value(&result).unwrap(), serde_json::json!({ "changed": true }));
    assert_eq!(transport.request_count(), 2);
    assert!(transport.envelopes()[0].contains("5c0ffee1d0551e4"));
    assert_eq!(gateway.registration(), Some(KEY));

    let license = gateway.files.get("/config/bigip.license").unwrap();
    assert!(license.contains("Registration Key :     AAAAA-BBBBB-CCCCC-DDDDD-EEEEEEE"));
    assert!(license.contains(r#"# Platform "Z100" and "$product" markers"#));
    assert!(license.ends_with("signature :            7c1f0b2d9e"));
    let eula = gateway.files.get("/LICENSE.F5").unwrap();
    assert!(eula.starts_with("END USER LICENSE AGREEMENT"));
}

#[test]
fn test_license_text_is_escaped_in_heredoc() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![Ok(LICENSE_RETURNED.to_vec())]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new().with_dossier("5c0ffee1d0551e4").on_reload(Some(KEY));

    run(&present_params(), &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();

    let write = gateway
        .commands
        .iter()
        .find_map(|c| match c {
            DeviceCommand::Bash { script } if script.starts_with("cat > /config/bigip.license") => {
                Some(script.clone())
            }
            _ => None,
        })
        .unwrap();
    assert!(write.contains(r#"\"Z100\""#));
    assert!(write.contains(r#"\"\$product\""#));
    assert!(!write.contains(r#" "Z100""#));
    assert!(write.ends_with("\nEOF"));
}

#[test]
fn test_present_already_licensed_makes_no_requests() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::licensed(KEY);

    let result = run(&present_params(), &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();

    assert!(!result.changed);
    assert_eq!(transport.request_count(), 0);
    assert!(gateway.commands.is_empty());
}

#[test]
fn test_eula_not_accepted_touches_nothing() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![Ok(LICENSE_RETURNED.to_vec())]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new().with_dossier("5c0ffee1d0551e4");
    let params = ModuleParams::from_yaml(&format!("license_key: {}\n", KEY)).unwrap();

    let err = run(&params, &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap_err();

    assert!(matches!(err, LicenseError::EulaNotAccepted));
    assert!(err.to_string().starts_with("EULA/"));
    assert!(gateway.mutating_commands().is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn test_missing_key_is_rejected_before_device_access() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new();
    let params = ModuleParams::from_yaml("accept_eula: true\n").unwrap();

    let err = run(&params, &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap_err();

    assert!(matches!(err, LicenseError::InvalidInput(_)));
    assert_eq!(gateway.registration_reads, 0);
}

#[test]
fn test_remote_fault_leaves_device_untouched() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::always(Ok(LICENSING_FAULT.to_vec()));
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new().with_dossier("5c0ffee1d0551e4");

    let err = run(&present_params(), &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "ACTIVATION/license server fault 51092: This license has already been activated on a different unit."
    );
    assert!(gateway.mutating_commands().is_empty());
}

#[test]
fn test_unsettled_appliance_times_out() {
    let profile = ReconcilerProfile::from_yaml(
        "polling:\n  warmup_ms: 1000\n  interval_ms: 1000\n  max_wait_ms: 10000\n",
    )
    .unwrap();
    let transport = ScriptedTransport::with_responses(vec![Ok(LICENSE_RETURNED.to_vec())]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new()
        .with_dossier("5c0ffee1d0551e4")
        .on_reload(Some(KEY))
        .with_readiness(vec![Ok(false); 64]);

    let err = run(&present_params(), &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap_err();

    assert!(matches!(err, LicenseError::ConvergenceTimeout { checks: 10, waited_ms: 10_000 }));
    assert!(err.to_string().starts_with("TIMEOUT/"));
}

#[test]
fn test_profile_paths_are_used() {
    let profile = ReconcilerProfile::from_yaml(
        "paths:\n  license_path: /var/tmp/bigip.license\n  eula_path: /var/tmp/LICENSE.F5\n",
    )
    .unwrap();
    let transport = ScriptedTransport::with_responses(vec![Ok(LICENSE_RETURNED.to_vec())]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::new().with_dossier("5c0ffee1d0551e4").on_reload(Some(KEY));

    run(&present_params(), &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();

    assert!(gateway.files.contains_key("/var/tmp/bigip.license"));
    assert!(gateway.files.contains_key("/var/tmp/LICENSE.F5"));
    assert!(!gateway.files.contains_key("/config/bigip.license"));
}

// =============================================================================
// state: absent
// =============================================================================

#[test]
fn test_absent_removes_license() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::licensed(KEY)
        .with_file("/config/bigip.license", "license")
        .with_file("/LICENSE.F5", "eula")
        .on_reload(None);
    let params = ModuleParams::from_yaml("state: absent\n").unwrap();

    let result = run(&params, &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();

    assert!(result.changed);
    assert!(gateway.files.is_empty());
    assert_eq!(transport.request_count(), 0);
}

#[test]
fn test_absent_twice_is_idempotent() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::licensed(KEY).on_reload(None);
    let params = ModuleParams::from_yaml("state: absent\n").unwrap();

    // license files already gone on the device, registration still cached
    let first = run(&params, &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();
    let commands_after_first = gateway.commands.len();
    let second = run(&params, &ExecutionContext::new(), &profile, &mut gateway, &transport, &clock)
        .unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(gateway.commands.len(), commands_after_first);
}

#[test]
fn test_absent_check_mode_reports_change_only() {
    let profile = ReconcilerProfile::default();
    let transport = ScriptedTransport::with_responses(vec![]);
    let clock = ManualClock::new();
    let mut gateway = MockGateway::licensed(KEY).with_file("/config/bigip.license", "license");
    let params = ModuleParams::from_yaml("state: absent\n").unwrap();

    let result = run(
        &params,
        &ExecutionContext::new().check_mode(true),
        &profile,
        &mut gateway,
        &transport,
        &clock,
    )
    .unwrap();

    assert!(result.changed);
    assert!(gateway.commands.is_empty());
    assert_eq!(gateway.files.len(), 1);
}
