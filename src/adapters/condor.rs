//! HTCondor wrapper scripts and submit descriptions.

use crate::config::CondorSettings;
use crate::domain::ports::JobSubmitter;
use crate::utils::error::{QfError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Writes an executable bash script that sets up the environment, enters
/// `workdir` and runs `commands` in order.
pub fn write_wrapper(
    path: &Path,
    commands: &[String],
    workdir: &Path,
    settings: &CondorSettings,
) -> Result<()> {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str("# Later points still run when an earlier fit fails, so no `set -e`.\n\n");

    for line in &settings.setup_commands {
        script.push_str(line);
        script.push('\n');
    }
    script.push_str(&format!("\ncd {}\n\n", workdir.display()));

    for command in commands {
        script.push_str(command);
        script.push('\n');
    }

    std::fs::write(path, script)?;
    make_executable(path)?;
    tracing::debug!("📝 Wrote wrapper {}", path.display());
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Resource requests shared by every job in a submit file.
pub fn submit_header(queue: &str, settings: &CondorSettings) -> String {
    format!(
        "universe = {}\n\
         getenv = True\n\
         +UseOS = \"{}\"\n\
         +JobCategory = \"{}\"\n\
         request_cpus = {}\n\
         request_memory = {}\n\n",
        settings.universe, settings.use_os, queue, settings.request_cpus, settings.request_memory
    )
}

pub fn submit_job_block(wrapper: &Path, logs_dir: &Path, job_name: &str) -> String {
    let logs = logs_dir.display();
    format!(
        "executable = {}\n\
         JobBatchName = {job}\n\
         log = {logs}/{job}.log\n\
         output = {logs}/{job}.out\n\
         error = {logs}/{job}.err\n\
         queue\n",
        wrapper.display(),
        job = job_name,
        logs = logs
    )
}

/// Submit file holding a single job.
pub fn write_single_submit(
    submit_path: &Path,
    wrapper: &Path,
    logs_dir: &Path,
    job_name: &str,
    queue: &str,
    settings: &CondorSettings,
) -> Result<()> {
    let content = submit_header(queue, settings) + &submit_job_block(wrapper, logs_dir, job_name);
    std::fs::write(submit_path, content)?;
    Ok(())
}

/// Submit file queueing one job per `(wrapper, job_name)` pair.
pub fn write_multi_submit(
    submit_path: &Path,
    jobs: &[(std::path::PathBuf, String)],
    logs_dir: &Path,
    queue: &str,
    settings: &CondorSettings,
) -> Result<()> {
    let mut content = submit_header(queue, settings);
    for (wrapper, job_name) in jobs {
        content.push_str(&submit_job_block(wrapper, logs_dir, job_name));
        content.push('\n');
    }
    std::fs::write(submit_path, content)?;
    Ok(())
}

/// Runs `condor_submit` on the submit file.
#[derive(Debug, Clone)]
pub struct CondorSubmitter {
    program: String,
}

impl Default for CondorSubmitter {
    fn default() -> Self {
        Self {
            program: "condor_submit".to_string(),
        }
    }
}

impl CondorSubmitter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl JobSubmitter for CondorSubmitter {
    async fn submit(&self, submit_file: &Path) -> Result<()> {
        let output = Command::new(&self.program)
            .arg(submit_file)
            .output()
            .await
            .map_err(|e| QfError::SubmissionError {
                submit_file: submit_file.to_path_buf(),
                details: format!("{}: {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(QfError::SubmissionError {
                submit_file: submit_file.to_path_buf(),
                details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!("📤 {}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}

/// Leaves the submit file on disk without contacting the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunSubmitter;

#[async_trait]
impl JobSubmitter for DryRunSubmitter {
    async fn submit(&self, submit_file: &Path) -> Result<()> {
        tracing::info!("🧪 Dry run, not submitting {}", submit_file.display());
        Ok(())
    }
}
