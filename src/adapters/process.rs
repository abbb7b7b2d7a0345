use crate::core::command::QuickFitCommand;
use crate::domain::model::RunStatus;
use crate::domain::ports::FitExecutor;
use crate::utils::error::{QfError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Runs quickFit on this host and waits for it.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FitExecutor for LocalExecutor {
    async fn execute(&self, command: &QuickFitCommand, log_file: Option<&Path>) -> Result<RunStatus> {
        tracing::debug!("▶️ {}", command.to_shell_string());

        let mut process = Command::new(&command.program);
        process.args(command.to_args()).stdin(Stdio::null());

        match log_file {
            Some(path) => {
                let log = std::fs::File::create(path)?;
                let log_err = log.try_clone()?;
                process.stdout(Stdio::from(log)).stderr(Stdio::from(log_err));
            }
            None => {
                process.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let status = process
            .status()
            .await
            .map_err(|e| QfError::SubprocessError {
                program: command.program.clone(),
                details: e.to_string(),
            })?;

        Ok(RunStatus::from_code(status.code()))
    }
}
