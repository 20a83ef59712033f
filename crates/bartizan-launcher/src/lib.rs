//! # Bartizan Launcher
//!
//! Executes what `bartizan-core` assembles: stages pretrained checkpoints
//! and preprocessed datasets onto scratch storage, runs or queues the
//! `fairseq-train` invocation, and chains the follow-up ranking job through
//! `sbatch`.

pub mod chain;
pub mod launch;
pub mod plan;
pub mod runner;
pub mod staging;

pub use launch::{launch, LaunchMode};
pub use plan::{LaunchConfig, LaunchPlan};
