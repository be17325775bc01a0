//! Device Gateway: the appliance-side capability the reconciler consumes
//!
//! The concrete transport (iControl REST, SSH, ...) lives outside this
//! workspace. It receives typed [`DeviceCommand`] values and maps them onto
//! the appliance utility endpoints (`get_dossier`, `bash`, `unix_rm`).
use crate::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Script whose output contains `running` once mcpd is up
pub const READINESS_CHECK_SCRIPT: &str = "tmsh show sys mcp-state | grep running";

/// Re-reads license and EULA files into the running system
pub const RELOAD_LICENSE_SCRIPT: &str = "/usr/bin/reloadlic";

const HEREDOC_DELIMITER: &str = "EOF";

/// One command for the appliance utility endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "utility", rename_all = "snake_case")]
pub enum DeviceCommand {
    GetDossier { registration_key: String },
    Bash { script: String },
    UnixRm { path: String },
}

impl DeviceCommand {
    pub fn bash(script: impl Into<String>) -> Self {
        Self::Bash {
            script: script.into(),
        }
    }

    pub fn readiness_check() -> Self {
        Self::bash(READINESS_CHECK_SCRIPT)
    }

    pub fn reload_license() -> Self {
        Self::bash(RELOAD_LICENSE_SCRIPT)
    }

    /// Utility endpoint name
    pub fn utility(&self) -> &'static str {
        match self {
            Self::GetDossier { .. } => "get_dossier",
            Self::Bash { .. } => "bash",
            Self::UnixRm { .. } => "unix_rm",
        }
    }

    /// Argument string in the `utilCmdArgs` form the utility expects
    pub fn util_cmd_args(&self) -> String {
        match self {
            Self::GetDossier { registration_key } => format!("-b {}", registration_key),
            Self::Bash { script } => format!("-c \"{}\"", script),
            Self::UnixRm { path } => path.clone(),
        }
    }

    /// Whether running the command can change appliance state
    pub fn is_mutating(&self) -> bool {
        match self {
            Self::GetDossier { .. } => false,
            Self::Bash { script } => script != READINESS_CHECK_SCRIPT,
            Self::UnixRm { .. } => true,
        }
    }
}

/// Result of a utility command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// `commandResult` field; absent when the command printed nothing
    pub command_result: Option<String>,
}

impl CommandOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_result(result: impl Into<String>) -> Self {
        Self {
            command_result: Some(result.into()),
        }
    }
}

/// Command execution and license registration access on one appliance
pub trait DeviceGateway {
    /// Runs a privileged utility command
    fn run_command(&mut self, command: &DeviceCommand) -> Result<CommandOutput, GatewayError>;

    /// Current registration key, if the appliance is licensed
    fn registration_key(&mut self) -> Result<Option<String>, GatewayError>;

    /// Writes `content` to `path` through a bash heredoc
    fn write_heredoc(&mut self, path: &str, content: &str) -> Result<(), GatewayError> {
        self.run_command(&DeviceCommand::bash(heredoc_script(path, content)))
            .map(|_| ())
    }
}

impl<G: DeviceGateway + ?Sized> DeviceGateway for &mut G {
    fn run_command(&mut self, command: &DeviceCommand) -> Result<CommandOutput, GatewayError> {
        (**self).run_command(command)
    }

    fn registration_key(&mut self) -> Result<Option<String>, GatewayError> {
        (**self).registration_key()
    }

    fn write_heredoc(&mut self, path: &str, content: &str) -> Result<(), GatewayError> {
        (**self).write_heredoc(path, content)
    }
}

/// Characters a backslash escapes inside a double-quoted bash string
const DOUBLE_QUOTE_SPECIALS: [char; 4] = ['\\', '$', '`', '"'];

/// Escapes `content` for the `-c "..."` string the bash utility receives.
///
/// Backslash is escaped along with `$`, backtick and `"`, so no payload can
/// close the string or start an expansion. Single quotes need no escape there.
pub fn escape_heredoc_payload(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for c in content.chars() {
        if DOUBLE_QUOTE_SPECIALS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// What bash makes of an escaped payload inside double quotes
pub(crate) fn unescape_heredoc_payload(payload: &str) -> String {
    let mut content = String::with_capacity(payload.len());
    let mut chars = payload.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if DOUBLE_QUOTE_SPECIALS.contains(&next) {
                    content.push(next);
                    chars.next();
                    continue;
                }
            }
        }
        content.push(c);
    }
    content
}

/// `EOF`, or `EOF_<n>` when the content has a line equal to `EOF`
fn heredoc_delimiter(content: &str) -> String {
    let mut delimiter = HEREDOC_DELIMITER.to_string();
    let mut suffix = 0u32;
    while content.lines().any(|line| line == delimiter) {
        suffix += 1;
        delimiter = format!("{}_{}", HEREDOC_DELIMITER, suffix);
    }
    delimiter
}

/// `cat > path <<'EOF'` script carrying the escaped payload.
///
/// The quoted delimiter keeps bash from expanding the heredoc body.
pub fn heredoc_script(path: &str, content: &str) -> String {
    let payload = escape_heredoc_payload(content);
    let delimiter = heredoc_delimiter(content);
    format!(
        "cat > {path} <<'{delim}'\n{payload}\n{delim}",
        path = path,
        delim = delimiter,
        payload = payload
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_util_cmd_args() {
        let dossier = DeviceCommand::GetDossier {
            registration_key: "AAAAA-BBBBB".into(),
        };
        assert_eq!(dossier.utility(), "get_dossier");
        assert_eq!(dossier.util_cmd_args(), "-b AAAAA-BBBBB");

        assert_eq!(
            DeviceCommand::reload_license().util_cmd_args(),
            "-c \"/usr/bin/reloadlic\""
        );
        assert_eq!(
            DeviceCommand::UnixRm { path: "/LICENSE.F5".into() }.util_cmd_args(),
            "/LICENSE.F5"
        );
    }

    #[test]
    fn test_mutation_classification() {
        assert!(!DeviceCommand::readiness_check().is_mutating());
        assert!(!DeviceCommand::GetDossier { registration_key: "K".into() }.is_mutating());
        assert!(DeviceCommand::reload_license().is_mutating());
        assert!(DeviceCommand::UnixRm { path: "/x".into() }.is_mutating());
    }

    #[test]
    fn test_escape_quotes_and_dollar() {
        assert_eq!(
            escape_heredoc_payload(r#"Name = "Local Traffic Manager" $x 'y' `id`"#),
            r#"Name = \"Local Traffic Manager\" \$x 'y' \`id\`"#
        );
        assert_eq!(escape_heredoc_payload("plain text"), "plain text");
    }

    #[test]
    fn test_escape_backslash_before_quote() {
        let escaped = escape_heredoc_payload(r#"Terms \"; reboot; echo \$PATH"#);
        assert_eq!(escaped, r#"Terms \\\"; reboot; echo \\\$PATH"#);
        assert_eq!(unescape_heredoc_payload(&escaped), r#"Terms \"; reboot; echo \$PATH"#);
    }

    #[test]
    fn test_unescape_keeps_other_backslashes() {
        let content = r#"C:\Program Files\F5 'n' "q" \\ $v"#;
        assert_eq!(unescape_heredoc_payload(&escape_heredoc_payload(content)), content);
    }

    #[test]
    fn test_heredoc_script_layout() {
        let script = heredoc_script("/config/bigip.license", "Licensed date : 20261018");
        assert_eq!(
            script,
            "cat > /config/bigip.license <<'EOF'\nLicensed date : 20261018\nEOF"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_bash_writes_hostile_payload_verbatim() {
        let scratch = std::env::temp_dir();
        let target = scratch.join(format!("bigip-heredoc-{}.txt", std::process::id()));
        let marker = scratch.join(format!("bigip-heredoc-{}.marker", std::process::id()));
        let marker = marker.display();
        let content = format!(
            "Terms \\\"; touch {m}; echo \\\" end\n$(touch {m}) `touch {m}` ${{HOME}} 'q' \\n\nEOF\nlast",
            m = marker
        );

        let command = DeviceCommand::bash(heredoc_script(&target.display().to_string(), &content));
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("bash {}", command.util_cmd_args()))
            .status()
            .unwrap();

        assert!(status.success());
        assert!(!std::path::Path::new(&marker.to_string()).exists());
        let written = std::fs::read_to_string(&target).unwrap();
        std::fs::remove_file(&target).unwrap();
        assert_eq!(written, format!("{}\n", content));
    }

    #[test]
    fn test_heredoc_delimiter_avoids_collision() {
        let script = heredoc_script("/LICENSE.F5", "line one\nEOF\nline three");
        assert!(script.starts_with("cat > /LICENSE.F5 <<'EOF_1'\n"));
        assert!(script.ends_with("\nEOF_1"));

        let script = heredoc_script("/LICENSE.F5", "EOF\nEOF_1");
        assert!(script.starts_with("cat > /LICENSE.F5 <<'EOF_2'\n"));
    }
}
