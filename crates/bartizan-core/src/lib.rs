//! # Bartizan Core
//!
//! Typed configuration and command assembly for BART fine-tuning jobs on a
//! SLURM cluster. Turns an experiment description (task, hyperparameters,
//! paths) into the exact `fairseq-train` argument vector and `#SBATCH`
//! batch script the cluster expects. Pure assembly only; process execution
//! lives in `bartizan-launcher`.
//!
//! ## Quick Start
//!
//! ```rust
//! use bartizan_core::{Hyperparams, Schedule};
//!
//! let hp = Hyperparams::classification();
//! let schedule = Schedule::derive(&hp).unwrap();
//!
//! assert_eq!(schedule.total_updates, hp.updates_per_epoch * hp.max_epochs);
//! assert!(schedule.warmup_updates <= schedule.total_updates);
//! ```
pub mod error;
pub mod fairseq;
pub mod hyperparams;
pub mod paths;
pub mod slurm;
pub mod task;

// Re-export primary API
pub use error::{BartizanError, Result};
pub use fairseq::{FairseqInvocation, FAIRSEQ_TRAIN};
pub use hyperparams::{Hyperparams, Schedule, TaskKind};
pub use paths::{default_workspace_root, PathLayout, BART_ARCHIVE, BART_CHECKPOINT, BART_DIR};
pub use slurm::{parse_job_id, render_batch_script, Dependency, RankingJob, SbatchDirectives};
pub use task::{TaskSpec, KNOWN_TASKS};
