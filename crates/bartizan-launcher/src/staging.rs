//! Staging of input artifacts onto node-local scratch storage.
//!
//! Both the pretrained checkpoint and the preprocessed dataset ship as
//! `.tar.gz` archives on the shared filesystem. Staging copies them into
//! scratch and extracts them with the system `tar`, skipping artifacts that
//! are already in place so a restarted job does not re-copy gigabytes.

use std::path::Path;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, info};

use bartizan_core::{PathLayout, TaskSpec, BART_DIR};

/// Stage the pretrained checkpoint and the task dataset into scratch.
pub async fn stage(layout: &PathLayout, task: &TaskSpec) -> Result<()> {
    stage_archive(
        &layout.bart_archive(),
        &layout.scratch,
        &layout.scratch.join(BART_DIR),
    )
    .await?;
    stage_archive(
        &layout.task_archive(task),
        &layout.scratch,
        &layout.staged_data_dir(task),
    )
    .await?;
    Ok(())
}

/// Copy one archive into `scratch` and extract it there. A pre-existing
/// `extracted` directory short-circuits the whole step.
async fn stage_archive(archive: &Path, scratch: &Path, extracted: &Path) -> Result<()> {
    if extracted.is_dir() {
        debug!(path = %extracted.display(), "already staged, skipping");
        return Ok(());
    }
    if !archive.is_file() {
        bail!("missing artifact: {}", archive.display());
    }

    tokio::fs::create_dir_all(scratch)
        .await
        .with_context(|| format!("creating scratch dir {}", scratch.display()))?;

    let file_name = archive
        .file_name()
        .with_context(|| format!("archive path has no file name: {}", archive.display()))?;
    let staged = scratch.join(file_name);

    info!(from = %archive.display(), to = %staged.display(), "copying archive");
    tokio::fs::copy(archive, &staged)
        .await
        .with_context(|| format!("copying {}", archive.display()))?;

    info!(archive = %staged.display(), "extracting");
    let status = Command::new("tar")
        .arg("-xzf")
        .arg(file_name)
        .current_dir(scratch)
        .status()
        .await
        .context("failed to execute tar")?;

    if !status.success() {
        bail!(
            "tar -xzf {} exited with status {:?}",
            staged.display(),
            status.code()
        );
    }
    Ok(())
}
