//! Experiment submission CLI.
//!
//! Collects the experiment description from flags and environment, then
//! either runs training in the current allocation or queues it with sbatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use bartizan_core::TaskKind;
use bartizan_launcher::{launch, LaunchConfig, LaunchMode};

/// CLI arguments
#[derive(Parser)]
#[command(name = "submit")]
#[command(about = "Submit BART fine-tuning jobs to the cluster")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Modeling task name, e.g. context_free
    #[arg(short, long)]
    task: String,

    /// Experiment name, keys checkpoint and log directories
    #[arg(short, long)]
    experiment: String,

    /// Objective kind: classification or generation
    #[arg(short, long, default_value = "classification")]
    kind: String,

    /// Epochs to train for
    #[arg(long)]
    epochs: Option<u32>,

    /// Optimizer steps per epoch on this dataset
    #[arg(long)]
    updates_per_epoch: Option<u32>,

    /// Learning rate warmup, as a percentage of total updates
    #[arg(long)]
    warmup_percent: Option<u32>,

    /// Peak learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Sentences per batch
    #[arg(short, long)]
    batch_size: Option<u32>,

    /// Candidates per ranking instance the dataset was built with
    #[arg(long)]
    ranking_size: Option<u32>,

    /// Validation split proportion of the dataset variant
    #[arg(long, default_value_t = 0.25)]
    valid_proportion: f64,

    /// Test split proportion of the dataset variant
    #[arg(long, default_value_t = 0.25)]
    test_proportion: f64,

    /// Use the cross-validation dataset variant
    #[arg(long)]
    cross_validation: bool,

    /// Use the shortened debug dataset variant
    #[arg(long)]
    short: bool,

    /// Project directory on the shared filesystem
    #[arg(short = 'r', long, env = "BARTIZAN_ROOT")]
    root: Option<PathBuf>,

    /// Node-local staging directory
    #[arg(short = 's', long, env = "SLURM_TMPDIR")]
    scratch: Option<PathBuf>,

    /// Wall-clock limit, SLURM syntax
    #[arg(long)]
    time: Option<String>,

    /// Memory request, SLURM syntax
    #[arg(long)]
    mem: Option<String>,

    /// Generic resource request, e.g. gpu:1
    #[arg(long)]
    gres: Option<String>,

    /// Partition to queue on
    #[arg(long)]
    partition: Option<String>,

    /// Ranking evaluation script submitted after training
    #[arg(long)]
    ranking_script: Option<PathBuf>,

    /// Skip the follow-up ranking submission
    #[arg(long)]
    no_chain: bool,

    /// Print the resolved command or script without executing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stage data and run fairseq-train in the current allocation
    Run,
    /// Write the generated batch script and submit it with sbatch
    Submit,
}

impl Cli {
    fn into_parts(self) -> Result<(LaunchConfig, LaunchMode, bool)> {
        let kind: TaskKind = self.kind.parse()?;
        let mut config = LaunchConfig::new(&self.task, &self.experiment, kind);
        config.max_epochs = self.epochs;
        config.updates_per_epoch = self.updates_per_epoch;
        config.warmup_percent = self.warmup_percent;
        config.lr = self.lr;
        config.batch_size = self.batch_size;
        config.ranking_size = self.ranking_size;
        config.valid_proportion = self.valid_proportion;
        config.test_proportion = self.test_proportion;
        config.cross_validation = self.cross_validation;
        config.short = self.short;
        config.root = self.root;
        config.scratch = self.scratch;
        config.time = self.time;
        config.mem = self.mem;
        config.gres = self.gres;
        config.partition = self.partition;
        config.ranking_script = self.ranking_script;
        config.no_chain = self.no_chain;

        let mode = match self.command {
            Commands::Run => LaunchMode::Run,
            Commands::Submit => LaunchMode::Submit,
        };
        Ok((config, mode, self.dry_run))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let (config, mode, dry_run) = cli.into_parts()?;

    launch(&config, mode, dry_run).await
}
