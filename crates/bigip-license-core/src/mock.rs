//! Mock device gateway for testing.
//!
//! Records every command, keeps a small model of the appliance files and
//! registration, and serves scripted readiness readings so reconciliation
//! flows can be tested deterministically.

use std::collections::{BTreeMap, VecDeque};

use crate::error::GatewayError;
use crate::gateway::{
    unescape_heredoc_payload, CommandOutput, DeviceCommand, DeviceGateway, READINESS_CHECK_SCRIPT,
    RELOAD_LICENSE_SCRIPT,
};

type FailureRule = (Box<dyn Fn(&DeviceCommand) -> bool>, GatewayError);

/// A test-double appliance.
pub struct MockGateway {
    /// All commands executed against this gateway, in order.
    pub commands: Vec<DeviceCommand>,
    /// Files on the appliance, keyed by path.
    pub files: BTreeMap<String, String>,
    /// Number of `registration_key` reads.
    pub registration_reads: usize,
    registration: Option<String>,
    registration_after_reload: Option<Option<String>>,
    dossier: Option<String>,
    readiness: VecDeque<Result<bool, GatewayError>>,
    failures: Vec<FailureRule>,
}

impl MockGateway {
    pub fn new() -> Self {
        MockGateway {
            commands: Vec::new(),
            files: BTreeMap::new(),
            registration_reads: 0,
            registration: None,
            registration_after_reload: None,
            dossier: None,
            readiness: VecDeque::new(),
            failures: Vec::new(),
        }
    }

    /// Create a mock that is already licensed with `key`.
    pub fn licensed(key: &str) -> Self {
        let mut mock = Self::new();
        mock.registration = Some(key.to_string());
        mock
    }

    pub fn with_dossier(mut self, dossier: &str) -> Self {
        self.dossier = Some(dossier.to_string());
        self
    }

    pub fn with_file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    /// Registration the appliance reports after the next reload.
    pub fn on_reload(mut self, registration: Option<&str>) -> Self {
        self.registration_after_reload = Some(registration.map(str::to_string));
        self
    }

    /// Queue readiness readings; once drained the appliance reports ready.
    pub fn with_readiness(mut self, readings: Vec<Result<bool, GatewayError>>) -> Self {
        self.readiness.extend(readings);
        self
    }

    /// Fail every command matching `predicate` with `error`.
    pub fn fail_when(
        mut self,
        predicate: impl Fn(&DeviceCommand) -> bool + 'static,
        error: GatewayError,
    ) -> Self {
        self.failures.push((Box::new(predicate), error));
        self
    }

    pub fn registration(&self) -> Option<&str> {
        self.registration.as_deref()
    }

    /// Commands that could have changed appliance state.
    pub fn mutating_commands(&self) -> Vec<&DeviceCommand> {
        self.commands.iter().filter(|c| c.is_mutating()).collect()
    }

    pub fn readiness_check_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Bash { script } if script == READINESS_CHECK_SCRIPT))
            .count()
    }

    fn run_script(&mut self, script: &str) -> Result<CommandOutput, GatewayError> {
        if script == READINESS_CHECK_SCRIPT {
            return match self.readiness.pop_front() {
                Some(Ok(true)) | None => Ok(CommandOutput::with_result("phase: running\n")),
                Some(Ok(false)) => Ok(CommandOutput::empty()),
                Some(Err(e)) => Err(e),
            };
        }
        if script == RELOAD_LICENSE_SCRIPT {
            if let Some(next) = self.registration_after_reload.take() {
                self.registration = next;
            }
            return Ok(CommandOutput::empty());
        }
        if let Some(rest) = script.strip_prefix("cat > ") {
            // cat > <path> <<'DELIM'\n<payload>\nDELIM
            let (path, body) = rest.split_once(" <<").unwrap_or((rest, ""));
            let payload = body
                .split_once('\n')
                .and_then(|(_, tail)| tail.rsplit_once('\n'))
                .map(|(payload, _)| payload)
                .unwrap_or("");
            self.files
                .insert(path.to_string(), unescape_heredoc_payload(payload));
            return Ok(CommandOutput::empty());
        }
        for step in script.split(" && ") {
            if let Some(args) = step.strip_prefix("mv -f ") {
                let (src, dst) = args.split_once(' ').unwrap_or((args, ""));
                let content = self.files.remove(src).ok_or_else(|| GatewayError::NoSuchFile {
                    path: src.to_string(),
                })?;
                self.files.insert(dst.to_string(), content);
            } else if let Some(path) = step.strip_prefix("rm -f ") {
                self.files.remove(path);
            }
        }
        Ok(CommandOutput::empty())
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceGateway for MockGateway {
    fn run_command(&mut self, command: &DeviceCommand) -> Result<CommandOutput, GatewayError> {
        self.commands.push(command.clone());
        if let Some((_, error)) = self.failures.iter().find(|(matches, _)| matches(command)) {
            return Err(error.clone());
        }
        match command {
            DeviceCommand::GetDossier { .. } => Ok(CommandOutput {
                command_result: self.dossier.clone(),
            }),
            DeviceCommand::UnixRm { path } => match self.files.remove(path) {
                Some(_) => Ok(CommandOutput::empty()),
                None => Err(GatewayError::NoSuchFile { path: path.clone() }),
            },
            DeviceCommand::Bash { script } => {
                let script = script.clone();
                self.run_script(&script)
            }
        }
    }

    fn registration_key(&mut self) -> Result<Option<String>, GatewayError> {
        self.registration_reads += 1;
        Ok(self.registration.clone())
    }
}
