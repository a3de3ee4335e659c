use crate::runtime::ContainerError;

/// Abstraction over container runtime execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ContainerExecutor: Send + Sync {
    /// Execute a runtime command and capture stdout.
    async fn exec(&self, args: &[String]) -> Result<String, ContainerError>;

    /// Execute a runtime command, streaming its output to stderr so stdout
    /// stays reserved for the caller's report.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), ContainerError>;
}

/// Container runtime executor backed by a real CLI (`docker`, `podman`, ...).
pub struct RealExecutor {
    program: String,
}

impl RealExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for RealExecutor {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl ContainerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, ContainerError> {
        use std::process::Stdio;

        tracing::debug!(program = %self.program, ?args, "exec");
        let output = tokio::process::Command::new(&self.program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ContainerError::NotFound {
                program: self.program.clone(),
                source: e,
            })?;

        if output.status.success() {
            String::from_utf8(output.stdout).map_err(|e| ContainerError::InvalidUtf8 { source: e })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            Err(ContainerError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                stderr,
            })
        }
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), ContainerError> {
        use std::process::Stdio;

        tracing::debug!(program = %self.program, ?args, "exec (streaming)");
        let status = tokio::process::Command::new(&self.program)
            .args(args)
            .stdout(std::io::stderr())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ContainerError::NotFound {
                program: self.program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ContainerError::CommandFailed {
                program: self.program.clone(),
                args: args.to_vec(),
                stderr: format!("exit code: {status}"),
            })
        }
    }
}
