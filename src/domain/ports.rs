use crate::core::command::QuickFitCommand;
use crate::domain::model::{ResultEntry, RunStatus};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Runs one quickFit command to completion.
#[async_trait]
pub trait FitExecutor: Send + Sync {
    async fn execute(&self, command: &QuickFitCommand, log_file: Option<&Path>) -> Result<RunStatus>;
}

/// Reads the entries of a named tree from a fit output file.
pub trait ResultReader: Send + Sync {
    fn read_entries(&self, path: &Path, tree: &str) -> Result<Vec<ResultEntry>>;
}

/// Hands a batch submit description to the scheduler.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, submit_file: &Path) -> Result<()>;
}
