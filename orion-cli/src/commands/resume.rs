//! Resume command - continue a checkpointed session

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Args;
use orion_core::Config;

use super::{build_orchestrator, report};

/// Arguments for the resume command
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Session id printed by an earlier run
    #[arg(required = true)]
    pub session_id: String,
}

impl ResumeArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<ExitCode> {
        if config.workflow.checkpoint_dir.is_none() {
            bail!("Resuming needs workflow.checkpoint_dir (or ORION_CHECKPOINT_DIR) to be set");
        }

        let orchestrator = build_orchestrator(config)?;
        let state = orchestrator
            .resume(&self.session_id)
            .await
            .with_context(|| format!("Failed to resume session {}", self.session_id))?;
        Ok(report(&state))
    }
}
