//! Launch plan inspector.
//!
//! Resolves an experiment exactly the way `submit` would and prints the
//! result without touching the filesystem or the scheduler. Default output
//! is the full plan as JSON; `--script` and `--command` print the rendered
//! batch script or the bare training command line instead.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use bartizan_core::TaskKind;
use bartizan_launcher::{LaunchConfig, LaunchPlan};

#[derive(Parser)]
#[command(name = "bartizan-plan")]
#[command(about = "Print the resolved launch plan for an experiment")]
#[command(version)]
struct Cli {
    /// Modeling task name, e.g. context_free
    #[arg(short, long)]
    task: String,

    /// Experiment name
    #[arg(short, long)]
    experiment: String,

    /// Objective kind: classification or generation
    #[arg(short, long, default_value = "classification")]
    kind: String,

    #[arg(long)]
    epochs: Option<u32>,

    #[arg(long)]
    updates_per_epoch: Option<u32>,

    #[arg(long)]
    warmup_percent: Option<u32>,

    #[arg(long)]
    lr: Option<f64>,

    #[arg(short, long)]
    batch_size: Option<u32>,

    #[arg(long)]
    ranking_size: Option<u32>,

    #[arg(long, default_value_t = 0.25)]
    valid_proportion: f64,

    #[arg(long, default_value_t = 0.25)]
    test_proportion: f64,

    #[arg(long)]
    cross_validation: bool,

    #[arg(long)]
    short: bool,

    #[arg(short = 'r', long, env = "BARTIZAN_ROOT")]
    root: Option<PathBuf>,

    #[arg(short = 's', long, env = "SLURM_TMPDIR")]
    scratch: Option<PathBuf>,

    #[arg(long)]
    time: Option<String>,

    #[arg(long)]
    mem: Option<String>,

    #[arg(long)]
    gres: Option<String>,

    #[arg(long)]
    partition: Option<String>,

    #[arg(long)]
    ranking_script: Option<PathBuf>,

    /// Print the rendered batch script instead of JSON
    #[arg(long)]
    script: bool,

    /// Print the training command line instead of JSON
    #[arg(long, conflicts_with = "script")]
    command: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let kind: TaskKind = cli.kind.parse()?;
    let mut config = LaunchConfig::new(&cli.task, &cli.experiment, kind);
    config.max_epochs = cli.epochs;
    config.updates_per_epoch = cli.updates_per_epoch;
    config.warmup_percent = cli.warmup_percent;
    config.lr = cli.lr;
    config.batch_size = cli.batch_size;
    config.ranking_size = cli.ranking_size;
    config.valid_proportion = cli.valid_proportion;
    config.test_proportion = cli.test_proportion;
    config.cross_validation = cli.cross_validation;
    config.short = cli.short;
    config.root = cli.root;
    config.scratch = cli.scratch;
    config.time = cli.time;
    config.mem = cli.mem;
    config.gres = cli.gres;
    config.partition = cli.partition;
    config.ranking_script = cli.ranking_script;

    let plan = LaunchPlan::resolve(&config)?;

    if cli.script {
        print!("{}", plan.batch_script);
    } else if cli.command {
        println!("{}", plan.invocation.command_line());
    } else {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }

    Ok(())
}
