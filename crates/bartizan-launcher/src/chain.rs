//! Job submission and chaining through `sbatch`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

use bartizan_core::{parse_job_id, Dependency};

/// Submit a batch script, returning the scheduler's job id.
pub async fn submit_batch(
    script: &Path,
    args: &[String],
    dependency: Option<Dependency>,
) -> Result<u64> {
    submit_with_program("sbatch", script, args, dependency).await
}

async fn submit_with_program(
    program: &str,
    script: &Path,
    args: &[String],
    dependency: Option<Dependency>,
) -> Result<u64> {
    let mut cmd = Command::new(program);
    if let Some(dep) = dependency {
        cmd.arg(dep.flag());
    }
    cmd.arg(script);
    cmd.args(args);

    info!(script = %script.display(), ?dependency, "submitting batch job");

    let output = cmd
        .output()
        .await
        .with_context(|| format!("failed to execute {program}"))?;

    if !output.status.success() {
        bail!(
            "{program} failed with status {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let job_id = parse_job_id(&stdout)?;
    info!(job_id, "job submitted");
    Ok(job_id)
}
