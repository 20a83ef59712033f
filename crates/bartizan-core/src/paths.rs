//! Filesystem layout of a fine-tuning experiment.
//!
//! Everything is resolved relative to a workspace root (the project directory
//! on the cluster's shared filesystem) and a scratch directory (node-local
//! storage the job stages its inputs into).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::task::TaskSpec;

/// File name of the pretrained BART archive.
pub const BART_ARCHIVE: &str = "bart.large.tar.gz";

/// Directory the pretrained archive extracts to.
pub const BART_DIR: &str = "bart.large";

/// Checkpoint file inside the extracted pretrained directory.
pub const BART_CHECKPOINT: &str = "model.pt";

/// Default workspace root when none is configured.
pub fn default_workspace_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bartizan")
}

/// Resolved path layout for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLayout {
    /// Project directory on the shared filesystem.
    pub root: PathBuf,
    /// Node-local staging directory (`$SLURM_TMPDIR` on the cluster).
    pub scratch: PathBuf,
    /// Experiment name, used to separate checkpoint and log directories.
    pub experiment: String,
}

impl PathLayout {
    pub fn new(root: PathBuf, scratch: PathBuf, experiment: &str) -> Self {
        Self {
            root,
            scratch,
            experiment: experiment.to_string(),
        }
    }

    /// Directory holding pretrained model archives.
    pub fn pretrained_dir(&self) -> PathBuf {
        self.root.join("pretrained_models")
    }

    /// The pretrained BART archive on the shared filesystem.
    pub fn bart_archive(&self) -> PathBuf {
        self.pretrained_dir().join(BART_ARCHIVE)
    }

    /// The extracted pretrained checkpoint in scratch.
    pub fn staged_bart_checkpoint(&self) -> PathBuf {
        self.scratch.join(BART_DIR).join(BART_CHECKPOINT)
    }

    /// Directory holding preprocessed task archives.
    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join("modeling_tasks")
    }

    /// The task's dataset archive on the shared filesystem.
    pub fn task_archive(&self, task: &TaskSpec) -> PathBuf {
        self.tasks_dir().join(task.archive_name())
    }

    /// The binarized data directory in scratch, after extraction.
    pub fn staged_data_dir(&self, task: &TaskSpec) -> PathBuf {
        self.scratch.join(task.binarized_name())
    }

    /// Where checkpoints of this experiment are written.
    pub fn checkpoints_dir(&self, task: &TaskSpec) -> PathBuf {
        self.root
            .join("checkpoints")
            .join(task.dataset_name())
            .join(&self.experiment)
    }

    /// Where tensorboard event files of this experiment are written.
    pub fn tensorboard_dir(&self, task: &TaskSpec) -> PathBuf {
        self.root
            .join("tensorboard_logs")
            .join(task.dataset_name())
            .join(&self.experiment)
    }

    /// Where the generated batch script for this experiment is written.
    pub fn batch_script_path(&self, task: &TaskSpec) -> PathBuf {
        self.checkpoints_dir(task).join("submit.sh")
    }

    /// Pattern for the job's stdout/stderr log, with SLURM's `%j` job-id
    /// placeholder.
    pub fn job_log_pattern(&self, task: &TaskSpec) -> PathBuf {
        self.checkpoints_dir(task).join("slurm-%j.out")
    }
}

/// Render a path as a command-line argument.
pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
