//! In-place execution of the training process.

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::info;

use bartizan_core::FairseqInvocation;

/// Run `fairseq-train` to completion, inheriting stdio so training progress
/// lands in the job log.
pub async fn run_training(invocation: &FairseqInvocation) -> Result<()> {
    info!(command = %invocation.command_line(), "starting training");

    let status = Command::new(&invocation.program)
        .args(&invocation.args)
        .status()
        .await
        .with_context(|| format!("failed to execute {}", invocation.program))?;

    if !status.success() {
        bail!(
            "{} exited with status {:?}",
            invocation.program,
            status.code()
        );
    }

    info!("training finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // The real program is fairseq-train, which is not present in test
    // environments; exercise the status handling with plain shell commands.
    fn invocation(program: &str, args: &[&str]) -> FairseqInvocation {
        FairseqInvocation {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn successful_command_is_ok() {
        let inv = invocation("true", &[]);
        assert!(run_training(&inv).await.is_ok());
    }

    #[tokio::test]
    async fn failing_command_reports_exit_code() {
        let inv = invocation("false", &[]);
        let err = run_training(&inv).await.unwrap_err();
        assert!(err.to_string().contains("false"));
    }

    #[tokio::test]
    async fn missing_program_reports_context() {
        let inv = invocation("definitely-not-a-real-program", &[]);
        let err = run_training(&inv).await.unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }
}
