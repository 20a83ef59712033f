//! SLURM-facing pieces: `#SBATCH` directives, batch script generation, and
//! parsing of `sbatch` output for job chaining.

use serde::{Deserialize, Serialize};

use crate::error::{BartizanError, Result};
use crate::fairseq::FairseqInvocation;
use crate::paths::{path_arg, PathLayout, BART_ARCHIVE};
use crate::task::TaskSpec;

/// Resource requests for one job, rendered either as `#SBATCH` header lines
/// or as `sbatch` command-line arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SbatchDirectives {
    pub job_name: String,
    /// Partition to queue on, when the cluster needs one spelled out.
    pub partition: Option<String>,
    /// Generic resource request, `gpu:1` for a single-GPU fine-tuning job.
    pub gres: String,
    pub cpus_per_task: u32,
    /// Memory request in SLURM syntax, e.g. `32G`.
    pub mem: String,
    /// Wall-clock limit in SLURM syntax, e.g. `12:00:00`.
    pub time: String,
    /// Stdout/stderr pattern; `%j` expands to the job id.
    pub output: Option<String>,
}

impl SbatchDirectives {
    /// Single-GPU defaults matching the original submission scripts.
    pub fn gpu_defaults(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            partition: None,
            gres: "gpu:1".to_string(),
            cpus_per_task: 4,
            mem: "32G".to_string(),
            time: "12:00:00".to_string(),
            output: None,
        }
    }

    /// `#SBATCH` header lines for a generated batch script.
    pub fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("#SBATCH --job-name={}", self.job_name)];
        if let Some(partition) = &self.partition {
            lines.push(format!("#SBATCH --partition={partition}"));
        }
        lines.push(format!("#SBATCH --gres={}", self.gres));
        lines.push(format!("#SBATCH --cpus-per-task={}", self.cpus_per_task));
        lines.push(format!("#SBATCH --mem={}", self.mem));
        lines.push(format!("#SBATCH --time={}", self.time));
        if let Some(output) = &self.output {
            lines.push(format!("#SBATCH --output={output}"));
        }
        lines
    }
}

/// Scheduling dependency between chained jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dependency {
    /// Run only after the given job finished successfully.
    AfterOk(u64),
}

impl Dependency {
    pub fn flag(&self) -> String {
        match self {
            Self::AfterOk(id) => format!("--dependency=afterok:{id}"),
        }
    }
}

/// Extract the job id from sbatch's `Submitted batch job <id>` stdout.
pub fn parse_job_id(output: &str) -> Result<u64> {
    let re = regex::Regex::new(r"Submitted batch job (\d+)")?;
    let captures = re
        .captures(output)
        .ok_or_else(|| BartizanError::JobIdParse {
            output: output.trim().to_string(),
        })?;
    captures[1]
        .parse::<u64>()
        .map_err(|_| BartizanError::JobIdParse {
            output: output.trim().to_string(),
        })
}

/// The follow-up job submitted once training finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingJob {
    /// Path of the ranking evaluation batch script.
    pub script: std::path::PathBuf,
    /// Extra arguments forwarded to the script.
    pub args: Vec<String>,
}

/// Render a self-contained batch script: resource header, staging into
/// `$SLURM_TMPDIR`, and the training command. The follow-up ranking job is
/// chained by the launcher with an `afterok` dependency, not from inside the
/// script.
///
/// The invocation must have been assembled against a scratch-relative layout
/// (scratch = `.`), since the script changes into `$SLURM_TMPDIR` before
/// training.
pub fn render_batch_script(
    directives: &SbatchDirectives,
    layout: &PathLayout,
    task: &TaskSpec,
    invocation: &FairseqInvocation,
) -> String {
    let mut lines = vec!["#!/bin/bash".to_string()];
    lines.extend(directives.header_lines());
    lines.push(String::new());
    lines.push("set -e".to_string());
    lines.push(String::new());

    // Stage inputs to node-local storage.
    lines.push(format!(
        "cp {} \"$SLURM_TMPDIR/\"",
        path_arg(&layout.bart_archive())
    ));
    lines.push(format!(
        "cp {} \"$SLURM_TMPDIR/\"",
        path_arg(&layout.task_archive(task))
    ));
    lines.push("cd \"$SLURM_TMPDIR\"".to_string());
    lines.push(format!("tar -xzf {BART_ARCHIVE}"));
    lines.push(format!("tar -xzf {}", task.archive_name()));
    lines.push(String::new());

    // Output directories live on the shared filesystem.
    lines.push(format!(
        "mkdir -p {}",
        path_arg(&layout.checkpoints_dir(task))
    ));
    lines.push(format!(
        "mkdir -p {}",
        path_arg(&layout.tensorboard_dir(task))
    ));
    lines.push(String::new());

    lines.push(invocation.command_line());
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperparams::{Hyperparams, Schedule, TaskKind};
    use std::path::PathBuf;

    #[test]
    fn header_lines_include_resources() {
        let directives = SbatchDirectives::gpu_defaults("ft_context_free");
        let header = directives.header_lines();

        assert!(header.contains(&"#SBATCH --job-name=ft_context_free".to_string()));
        assert!(header.contains(&"#SBATCH --gres=gpu:1".to_string()));
        assert!(header.contains(&"#SBATCH --mem=32G".to_string()));
        assert!(header.contains(&"#SBATCH --time=12:00:00".to_string()));
        assert!(!header.iter().any(|l| l.contains("--partition")));
    }

    #[test]
    fn partition_is_rendered_when_set() {
        let mut directives = SbatchDirectives::gpu_defaults("job");
        directives.partition = Some("gpu_p1".into());
        let header = directives.header_lines();

        assert!(header.contains(&"#SBATCH --partition=gpu_p1".to_string()));
        assert!(header.contains(&"#SBATCH --cpus-per-task=4".to_string()));
    }

    #[test]
    fn job_id_parses_from_sbatch_output() {
        assert_eq!(parse_job_id("Submitted batch job 123456\n").unwrap(), 123456);
        assert!(parse_job_id("sbatch: error: invalid partition").is_err());
    }

    #[test]
    fn dependency_flag_rendering() {
        assert_eq!(
            Dependency::AfterOk(987).flag(),
            "--dependency=afterok:987"
        );
    }

    #[test]
    fn batch_script_is_self_contained() {
        let hp = Hyperparams::for_kind(TaskKind::Classification);
        let schedule = Schedule::derive(&hp).unwrap();
        let task = TaskSpec::new("context_free", 32).unwrap();

        let shared = PathLayout::new(
            PathBuf::from("/project/bartizan"),
            PathBuf::from("."),
            "ep5_warm6",
        );
        let invocation = FairseqInvocation::assemble(&hp, &schedule, &shared, &task);
        let directives = SbatchDirectives::gpu_defaults("ft_context_free");

        let script = render_batch_script(&directives, &shared, &task, &invocation);

        assert!(script.starts_with("#!/bin/bash\n#SBATCH --job-name=ft_context_free"));
        assert!(script.contains(
            "cp /project/bartizan/pretrained_models/bart.large.tar.gz \"$SLURM_TMPDIR/\""
        ));
        assert!(script.contains("tar -xzf contextfree_50-25-25_bs32.tar.gz"));
        assert!(script.contains("cd \"$SLURM_TMPDIR\""));
        assert!(script.contains("fairseq-train ./contextfree_50-25-25_bs32-bin"));
        assert!(script.ends_with('\n'));
    }
}
