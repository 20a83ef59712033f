//! End-to-end orchestration: resolve, stage, train or queue, chain.

use anyhow::{Context, Result};
use tracing::info;

use crate::plan::{LaunchConfig, LaunchPlan};
use crate::{chain, runner, staging};
use bartizan_core::Dependency;

/// How the training itself is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Stage and run `fairseq-train` in the current allocation.
    Run,
    /// Write the generated batch script and hand it to `sbatch`.
    Submit,
}

/// Launch one experiment. With `dry_run` the resolved command or script is
/// printed and nothing is executed.
pub async fn launch(config: &LaunchConfig, mode: LaunchMode, dry_run: bool) -> Result<()> {
    let plan = LaunchPlan::resolve(config)?;
    info!(
        task = %plan.task.dataset_name(),
        experiment = %plan.layout.experiment,
        total_updates = plan.schedule.total_updates,
        warmup_updates = plan.schedule.warmup_updates,
        "plan resolved"
    );

    match mode {
        LaunchMode::Run => {
            if dry_run {
                println!("{}", plan.invocation.command_line());
                return Ok(());
            }

            staging::stage(&plan.layout, &plan.task).await?;
            tokio::fs::create_dir_all(plan.layout.checkpoints_dir(&plan.task)).await?;
            tokio::fs::create_dir_all(plan.layout.tensorboard_dir(&plan.task)).await?;

            runner::run_training(&plan.invocation).await?;

            if let Some(ranking) = &plan.ranking {
                let job_id = chain::submit_batch(&ranking.script, &ranking.args, None).await?;
                info!(job_id, "ranking job submitted");
            }
        }
        LaunchMode::Submit => {
            if dry_run {
                println!("{}", plan.batch_script);
                return Ok(());
            }

            let script_path = plan.layout.batch_script_path(&plan.task);
            if let Some(parent) = script_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&script_path, &plan.batch_script)
                .await
                .with_context(|| format!("writing {}", script_path.display()))?;
            info!(script = %script_path.display(), "batch script written");

            let train_id = chain::submit_batch(&script_path, &[], None).await?;
            info!(job_id = train_id, "training job submitted");

            if let Some(ranking) = &plan.ranking {
                let job_id = chain::submit_batch(
                    &ranking.script,
                    &ranking.args,
                    Some(Dependency::AfterOk(train_id)),
                )
                .await?;
                info!(job_id, after = train_id, "ranking job chained");
            }
        }
    }

    Ok(())
}
