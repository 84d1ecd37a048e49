//! Shell-based job execution on the host.

use async_trait::async_trait;
use conveyor_core::interpolation::InterpolationContext;
use conveyor_core::plan::PlannedJob;
use conveyor_core::ports::{JobExecutor, JobResult};
use conveyor_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs a job's setup and execution steps as `sh -c` commands on the
/// host, one step at a time, stopping at the first non-zero exit.
///
/// The environment map is injected per step; secret values named by the
/// job are masked in streamed output. The `image` and `tags` attributes
/// are advisory here, a host shell has no use for them.
pub struct ShellExecutor {
    workspace: PathBuf,
}

impl ShellExecutor {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    async fn run_step(
        &self,
        command: &str,
        env: &HashMap<String, String>,
        interp: &InterpolationContext,
    ) -> Result<i32> {
        let expanded = interp.interpolate(command);
        debug!(command = %interp.mask_secrets(&expanded), "Running step");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&expanded)
            .current_dir(&self.workspace)
            .envs(env)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Executor(format!("failed to spawn step: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let out_interp = interp.clone();
        let stdout_handle = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(stream = "stdout", "{}", out_interp.mask_secrets(&line));
                }
            }
        });
        let err_interp = interp.clone();
        let stderr_handle = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(stream = "stderr", "{}", err_interp.mask_secrets(&line));
                }
            }
        });

        let status = child
            .wait()
            .await
            .map_err(|e| Error::Executor(format!("failed to wait for step: {}", e)))?;
        let _ = stdout_handle.await;
        let _ = stderr_handle.await;

        Ok(status.code().unwrap_or(-1))
    }
}

#[async_trait]
impl JobExecutor for ShellExecutor {
    async fn run_job(&self, job: &PlannedJob, env: &HashMap<String, String>) -> Result<JobResult> {
        let mut interp = InterpolationContext::new();
        interp.variables = env.clone();
        // Values bound from the secret store get masked in output.
        for name in &job.secrets {
            if let Some(value) = env.get(name) {
                interp.secrets.insert(name.clone(), value.clone());
            }
        }

        for step in job.before_script.iter().chain(job.script.iter()) {
            let exit_code = self.run_step(step, env, &interp).await?;
            if exit_code != 0 {
                return Ok(JobResult { exit_code });
            }
        }
        Ok(JobResult { exit_code: 0 })
    }
}
