//! Assembly of the `fairseq-train` argument vector.
//!
//! The flag surface here is fairseq's own BART fine-tuning vocabulary; this
//! module only decides which flags apply to which task kind and formats the
//! derived values. Assembly is pure: same inputs, same argv.

use serde::{Deserialize, Serialize};

use crate::hyperparams::{Hyperparams, Schedule, TaskKind};
use crate::paths::{path_arg, PathLayout};
use crate::task::TaskSpec;

/// Program name of the fairseq training entrypoint.
pub const FAIRSEQ_TRAIN: &str = "fairseq-train";

/// A fully assembled training invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairseqInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl FairseqInvocation {
    /// Build the full argv for one experiment.
    pub fn assemble(
        hp: &Hyperparams,
        schedule: &Schedule,
        layout: &PathLayout,
        task: &TaskSpec,
    ) -> Self {
        let mut args: Vec<String> = Vec::with_capacity(64);
        let mut flag = |name: &str, value: Option<String>| {
            args.push(name.to_string());
            if let Some(v) = value {
                args.push(v);
            }
        };

        // Data and checkpoint restore.
        flag(&path_arg(&layout.staged_data_dir(task)), None);
        flag(
            "--restore-file",
            Some(path_arg(&layout.staged_bart_checkpoint())),
        );
        flag("--reset-optimizer", None);
        flag("--reset-dataloader", None);
        flag("--reset-meters", None);

        // Architecture.
        flag("--arch", Some("bart_large".into()));
        flag("--task", Some(hp.kind.fairseq_task().into()));
        flag("--criterion", Some(hp.kind.criterion().into()));
        flag("--layernorm-embedding", None);
        flag("--share-all-embeddings", None);
        flag("--share-decoder-input-output-embed", None);
        flag("--required-batch-size-multiple", Some("1".into()));

        match hp.kind {
            TaskKind::Classification => {
                flag("--init-token", Some("0".into()));
                flag("--add-prev-output-tokens", None);
                let classes = hp.num_classes.unwrap_or(2);
                flag("--num-classes", Some(classes.to_string()));
                flag("--batch-size", Some(hp.batch_size.to_string()));
            }
            TaskKind::Generation => {
                flag("--source-lang", Some("source".into()));
                flag("--target-lang", Some("target".into()));
                flag("--truncate-source", None);
                flag("--label-smoothing", Some("0.1".into()));
                flag("--update-freq", Some(hp.update_freq.to_string()));
                flag("--skip-invalid-size-inputs-valid-test", None);
            }
        }
        flag("--max-tokens", Some(hp.max_tokens.to_string()));

        // Regularization and optimizer.
        flag("--dropout", Some(hp.dropout.to_string()));
        flag("--attention-dropout", Some(hp.attention_dropout.to_string()));
        flag("--weight-decay", Some(hp.weight_decay.to_string()));
        flag("--optimizer", Some("adam".into()));
        flag("--adam-betas", Some(hp.adam_betas_flag()));
        flag("--adam-eps", Some(format_float(hp.adam_eps)));
        flag("--clip-norm", Some(hp.clip_norm.to_string()));

        // Learning rate schedule, from the derived update counts.
        flag("--lr-scheduler", Some("polynomial_decay".into()));
        flag("--lr", Some(format_float(hp.lr)));
        flag("--total-num-update", Some(schedule.total_updates.to_string()));
        flag("--warmup-updates", Some(schedule.warmup_updates.to_string()));
        flag("--max-epoch", Some(hp.max_epochs.to_string()));

        // Mixed precision.
        flag("--fp16", None);
        if hp.kind == TaskKind::Classification {
            flag("--fp16-init-scale", Some("4".into()));
            flag("--threshold-loss-scale", Some("1".into()));
            flag("--fp16-scale-window", Some("128".into()));
        }

        if hp.kind == TaskKind::Classification {
            flag("--best-checkpoint-metric", Some("accuracy".into()));
            flag("--maximize-best-checkpoint-metric", None);
        }

        // Outputs.
        flag("--save-dir", Some(path_arg(&layout.checkpoints_dir(task))));
        flag(
            "--tensorboard-logdir",
            Some(path_arg(&layout.tensorboard_dir(task))),
        );
        flag("--seed", Some(hp.seed.to_string()));
        flag("--find-unused-parameters", None);

        Self {
            program: FAIRSEQ_TRAIN.to_string(),
            args,
        }
    }

    /// Render as a single shell command line, quoting arguments that need it.
    /// Used for logging and for the generated batch script.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

/// Lowercase scientific-free float rendering: fairseq accepts `1e-05` and
/// `0.00001` alike, but the scripts always wrote the short exponent form.
fn format_float(v: f64) -> String {
    if v != 0.0 && v.abs() < 1e-3 {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

/// Quote an argument for inclusion in a generated shell script.
fn shell_quote(arg: &str) -> String {
    let safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./=%:".contains(c));
    if safe && !arg.is_empty() {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}
