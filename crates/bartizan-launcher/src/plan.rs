//! Resolution of a launch configuration into a concrete plan.
//!
//! A [`LaunchConfig`] is what the CLI collects; a [`LaunchPlan`] is everything
//! resolved and rendered: the validated task, the derived schedule, the argv
//! for an in-place run and the batch script for a queued one. Resolution does
//! no filesystem or scheduler work, which is what lets `plan-preview` print
//! plans safely.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use bartizan_core::{
    default_workspace_root, render_batch_script, FairseqInvocation, Hyperparams, PathLayout,
    RankingJob, Result, SbatchDirectives, Schedule, TaskKind, TaskSpec,
};

/// Experiment description as collected from flags and environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Snake-case modeling task name.
    pub task: String,
    /// Experiment name, keys the checkpoint and log directories.
    pub experiment: String,
    pub kind: TaskKind,

    // Hyperparameter overrides; `None` keeps the per-kind default.
    pub max_epochs: Option<u32>,
    pub updates_per_epoch: Option<u32>,
    pub warmup_percent: Option<u32>,
    pub lr: Option<f64>,
    pub batch_size: Option<u32>,

    // Dataset variant selectors.
    pub valid_proportion: f64,
    pub test_proportion: f64,
    pub ranking_size: Option<u32>,
    pub cross_validation: bool,
    pub short: bool,

    // Locations.
    pub root: Option<PathBuf>,
    pub scratch: Option<PathBuf>,

    // Resource overrides.
    pub time: Option<String>,
    pub mem: Option<String>,
    pub gres: Option<String>,
    pub partition: Option<String>,

    // Follow-up ranking job.
    pub ranking_script: Option<PathBuf>,
    pub no_chain: bool,
}

impl LaunchConfig {
    pub fn new(task: &str, experiment: &str, kind: TaskKind) -> Self {
        Self {
            task: task.to_string(),
            experiment: experiment.to_string(),
            kind,
            max_epochs: None,
            updates_per_epoch: None,
            warmup_percent: None,
            lr: None,
            batch_size: None,
            valid_proportion: 0.25,
            test_proportion: 0.25,
            ranking_size: None,
            cross_validation: false,
            short: false,
            root: None,
            scratch: None,
            time: None,
            mem: None,
            gres: None,
            partition: None,
            ranking_script: None,
            no_chain: false,
        }
    }
}

/// A fully resolved experiment: validated, derived and rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub task: TaskSpec,
    pub hyperparams: Hyperparams,
    pub schedule: Schedule,
    pub layout: PathLayout,
    pub directives: SbatchDirectives,
    /// Training argv against the resolved scratch dir, for in-place runs.
    pub invocation: FairseqInvocation,
    /// Rendered batch script for queued runs.
    pub batch_script: String,
    pub ranking: Option<RankingJob>,
}

impl LaunchPlan {
    /// Resolve a configuration into a plan.
    pub fn resolve(config: &LaunchConfig) -> Result<Self> {
        let mut hp = Hyperparams::for_kind(config.kind);
        if let Some(v) = config.max_epochs {
            hp.max_epochs = v;
        }
        if let Some(v) = config.updates_per_epoch {
            hp.updates_per_epoch = v;
        }
        if let Some(v) = config.warmup_percent {
            hp.warmup_percent = v;
        }
        if let Some(v) = config.lr {
            hp.lr = v;
        }
        if let Some(v) = config.batch_size {
            hp.batch_size = v;
        }
        let schedule = Schedule::derive(&hp)?;

        let mut task = TaskSpec::new(&config.task, hp.batch_size)?;
        task.valid_proportion = config.valid_proportion;
        task.test_proportion = config.test_proportion;
        task.ranking_size = config.ranking_size;
        task.cross_validation = config.cross_validation;
        task.short = config.short;

        let root = config
            .root
            .clone()
            .unwrap_or_else(default_workspace_root);
        let scratch = config
            .scratch
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("bartizan"));
        let layout = PathLayout::new(root, scratch, &config.experiment);

        let mut directives =
            SbatchDirectives::gpu_defaults(&format!("ft_{}", config.experiment));
        if let Some(v) = &config.time {
            directives.time = v.clone();
        }
        if let Some(v) = &config.mem {
            directives.mem = v.clone();
        }
        if let Some(v) = &config.gres {
            directives.gres = v.clone();
        }
        directives.partition = config.partition.clone();
        directives.output = Some(layout.job_log_pattern(&task).to_string_lossy().into_owned());

        let invocation = FairseqInvocation::assemble(&hp, &schedule, &layout, &task);

        // The batch script stages into $SLURM_TMPDIR and cds there, so its
        // invocation uses scratch-relative paths.
        let script_layout = PathLayout::new(
            layout.root.clone(),
            PathBuf::from("."),
            &config.experiment,
        );
        let script_invocation =
            FairseqInvocation::assemble(&hp, &schedule, &script_layout, &task);
        let batch_script =
            render_batch_script(&directives, &script_layout, &task, &script_invocation);

        let ranking = match (&config.ranking_script, config.no_chain) {
            (Some(script), false) => Some(RankingJob {
                script: script.clone(),
                args: vec![task.dataset_name(), config.experiment.clone()],
            }),
            _ => None,
        };

        Ok(Self {
            task,
            hyperparams: hp,
            schedule,
            layout,
            directives,
            invocation,
            batch_script,
            ranking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LaunchConfig {
        let mut config =
            LaunchConfig::new("context_free", "ep5_warm6", TaskKind::Classification);
        config.root = Some(PathBuf::from("/project/bartizan"));
        config.scratch = Some(PathBuf::from("/scratch/job42"));
        config
    }

    #[test]
    fn resolve_applies_overrides() {
        let mut config = config();
        config.max_epochs = Some(10);
        config.updates_per_epoch = Some(100);
        config.warmup_percent = Some(10);
        config.lr = Some(2e-5);

        let plan = LaunchPlan::resolve(&config).unwrap();
        assert_eq!(plan.schedule.total_updates, 1000);
        assert_eq!(plan.schedule.warmup_updates, 100);
        assert_eq!(plan.hyperparams.lr, 2e-5);
        // Untouched fields keep the per-kind defaults.
        assert_eq!(plan.hyperparams.batch_size, 32);
    }

    #[test]
    fn resolve_keeps_defaults_without_overrides() {
        let plan = LaunchPlan::resolve(&config()).unwrap();
        assert_eq!(plan.schedule.total_updates, 1050);
        assert_eq!(plan.schedule.warmup_updates, 63);
        assert_eq!(plan.directives.job_name, "ft_ep5_warm6");
        assert!(plan.ranking.is_none());
    }

    #[test]
    fn invocation_uses_resolved_scratch_but_script_is_relative() {
        let plan = LaunchPlan::resolve(&config()).unwrap();

        assert_eq!(
            plan.invocation.args[0],
            "/scratch/job42/contextfree_50-25-25_bs32-bin"
        );
        assert!(plan
            .batch_script
            .contains("fairseq-train ./contextfree_50-25-25_bs32-bin"));
    }

    #[test]
    fn missing_scratch_falls_back_to_temp_dir() {
        let mut config = config();
        config.scratch = None;

        let plan = LaunchPlan::resolve(&config).unwrap();
        assert_eq!(plan.layout.scratch, std::env::temp_dir().join("bartizan"));
    }

    #[test]
    fn ranking_job_carries_task_and_experiment() {
        let mut config = config();
        config.ranking_script = Some(PathBuf::from("/project/bartizan/jobs/rank.sh"));

        let plan = LaunchPlan::resolve(&config).unwrap();
        let ranking = plan.ranking.unwrap();
        assert_eq!(
            ranking.args,
            vec!["contextfree_50-25-25_bs32".to_string(), "ep5_warm6".to_string()]
        );
    }

    #[test]
    fn no_chain_suppresses_ranking() {
        let mut config = config();
        config.ranking_script = Some(PathBuf::from("/project/bartizan/jobs/rank.sh"));
        config.no_chain = true;

        let plan = LaunchPlan::resolve(&config).unwrap();
        assert!(plan.ranking.is_none());
    }

    #[test]
    fn unknown_task_fails_resolution() {
        let mut config = config();
        config.task = "made_up".into();
        assert!(LaunchPlan::resolve(&config).is_err());
    }

    #[test]
    fn plan_serializes_to_json() {
        let plan = LaunchPlan::resolve(&config()).unwrap();
        let json = serde_json::to_string_pretty(&plan).unwrap();
        assert!(json.contains("\"total_updates\": 1050"));
        assert!(json.contains("fairseq-train"));
    }
}
