//! Script execution through a shell subprocess.
//!
//! The command template is interpolated, written to a temporary script file
//! named after the command path, and run by the selected shell. The script
//! file is removed on every exit path.

use crate::constants::{
    PARAM_COMMAND, PARAM_CWD, PARAM_RUN, PROCESS_START_FAILURE, SCRIPT_FILE_PREFIX,
};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::executor::{ExecutionContext, ExecutionValue, Executor};
use crate::engine::template::TemplateProcessor;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as ProcessCommand;
use tracing::{debug, warn};

/// Shell used to run a script file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Sh,
    Bash,
    Cmd,
    PowerShell,
    Pwsh,
}

impl Shell {
    pub fn program(&self) -> &'static str {
        match self {
            Shell::Sh => "sh",
            Shell::Bash => "bash",
            Shell::Cmd => "cmd",
            Shell::PowerShell => "powershell",
            Shell::Pwsh => "pwsh",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Shell::Sh | Shell::Bash => "sh",
            Shell::Cmd => "cmd",
            Shell::PowerShell | Shell::Pwsh => "ps1",
        }
    }

    fn args(&self, script: &Path) -> Vec<OsString> {
        let script = script.as_os_str().to_os_string();
        match self {
            Shell::Sh | Shell::Bash => vec![script],
            Shell::Cmd => vec!["/D".into(), "/C".into(), script],
            Shell::PowerShell | Shell::Pwsh => vec![
                "-NoProfile".into(),
                "-NonInteractive".into(),
                "-ExecutionPolicy".into(),
                "Bypass".into(),
                "-File".into(),
                script,
            ],
        }
    }

    /// Deterministic script location for a command path.
    ///
    /// Segments are escaped and then joined with `_`. Escaping covers `_`
    /// itself, so distinct paths always map to distinct files.
    pub fn script_path(&self, command_path: &[String]) -> PathBuf {
        let encoded: Vec<String> = command_path
            .iter()
            .map(|segment| encode_segment(segment))
            .collect();
        std::env::temp_dir().join(format!(
            "{}{}.{}",
            SCRIPT_FILE_PREFIX,
            encoded.join("_"),
            self.extension()
        ))
    }
}

/// Keeps ASCII letters, digits, `-` and `.`; every other byte becomes `+XX`.
fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("+{:02X}", byte));
        }
    }
    encoded
}

/// Owns a script file on disk and deletes it when dropped.
struct ScriptFile {
    path: PathBuf,
}

impl ScriptFile {
    async fn write(path: PathBuf, content: &str) -> EngineResult<Self> {
        // Take ownership before writing so a failed write is cleaned up too.
        let script = ScriptFile { path };
        let mut file = tokio::fs::File::create(&script.path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(script)
    }
}

impl Drop for ScriptFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove script file {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Runs the `command` (or `run`) parameter as a shell script.
///
/// Every resolved parameter is also exported to the subprocess environment,
/// under its own name and upper-cased. An optional `cwd` parameter sets the
/// working directory.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    shell: Shell,
}

impl ProcessExecutor {
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }

    fn build_command(&self, script: &Path, context: &ExecutionContext<'_>) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(self.shell.program());
        cmd.args(self.shell.args(script));

        for (key, value) in context.parameters.iter() {
            if key.is_empty() || key.contains('=') || key.contains('\0') {
                continue;
            }
            let value = value.to_string();
            cmd.env(key.to_uppercase(), &value);
            cmd.env(key, &value);
        }

        if let Some(cwd) = context.parameters.get(PARAM_CWD) {
            cmd.current_dir(context.interpolate(&cwd.to_string()));
        }

        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
        cmd
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn execute(&self, context: &ExecutionContext<'_>) -> EngineResult<ExecutionValue> {
        let template = context.required_str(&[PARAM_COMMAND, PARAM_RUN])?;

        for name in TemplateProcessor::placeholders(template) {
            if !context.parameters.contains_key(&name) {
                debug!(parent: context.span, placeholder = %name, "Template references an unknown parameter");
            }
        }
        let script = context.interpolate(template);

        let script_file = ScriptFile::write(self.shell.script_path(context.path), &script).await?;
        debug!(
            parent: context.span,
            shell = self.shell.program(),
            script = %script_file.path.display(),
            "Starting subprocess"
        );

        let mut child = match self.build_command(&script_file.path, context).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    parent: context.span,
                    "Failed to start {} for '{}': {}",
                    self.shell.program(),
                    context.display_path(),
                    e
                );
                return Ok(ExecutionValue::ExitCode(PROCESS_START_FAILURE));
            }
        };

        // Cancelling stops the wait; the child itself is not killed.
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = context.cancellation.cancelled() => {
                warn!(parent: context.span, "Cancelled while waiting for '{}'", context.display_path());
                return Err(EngineError::Cancelled);
            }
        };

        let code = status.code().unwrap_or(PROCESS_START_FAILURE);
        debug!(parent: context.span, exit_code = code, "Subprocess finished");
        Ok(ExecutionValue::ExitCode(code))
    }
}
