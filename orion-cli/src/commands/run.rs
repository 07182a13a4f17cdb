//! Run command - drive one instruction against a repository

use std::process::ExitCode;

use anyhow::Context;
use clap::Args;
use orion_core::explain::explain_repository;
use orion_core::git::LocalGit;
use orion_core::request::is_explain;
use orion_core::{Config, Secrets};

use super::{build_orchestrator, chat_model, report, WorkflowFlags};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Repository URL or owner/repo shorthand
    #[arg(required = true)]
    pub repo_url: String,

    /// The instruction; `explain` summarizes the repository instead
    #[arg(required = true)]
    pub prompt: String,

    /// Branch to clone and to target with the pull request
    #[arg(short, long, default_value = "main")]
    pub branch: String,

    #[command(flatten)]
    pub flags: WorkflowFlags,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<ExitCode> {
        let workdir = self.flags.workdir(config)?;

        if is_explain(&self.prompt) {
            let secrets = Secrets::load().context("Failed to load secrets")?;
            let model = chat_model(config, &secrets)?;
            let text = explain_repository(
                &LocalGit,
                model.as_ref(),
                &self.repo_url,
                &workdir,
                Some(self.branch.as_str()),
                self.flags.session_id.as_deref(),
            )
            .await
            .context("Failed to explain repository")?;
            println!("{}", text);
            return Ok(ExitCode::SUCCESS);
        }

        let inputs = self
            .flags
            .inputs(&self.repo_url, &self.branch, &self.prompt, workdir, config);

        println!("Orion Run");
        println!("=========");
        println!();
        println!("Repository: {} ({})", inputs.repo_url, inputs.branch);
        println!("Prompt: {}", inputs.prompt);
        println!("Working directory: {}", inputs.workdir.display());
        println!(
            "Testing: {}  Commit: {}  Pull request: {}",
            on_off(inputs.enable_testing),
            on_off(inputs.commit_changes),
            on_off(inputs.create_pr)
        );

        let orchestrator = build_orchestrator(config)?;
        let state = orchestrator.run(inputs, self.flags.session_id.clone()).await;
        Ok(report(&state))
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
