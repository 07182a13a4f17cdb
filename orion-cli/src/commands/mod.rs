//! CLI command implementations

pub mod config;
pub mod inspect;
pub mod message;
pub mod resume;
pub mod run;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use orion_core::env::LocalEnvironments;
use orion_core::generate::{ChatModel, LlmClient, LlmGenerator};
use orion_core::git::LocalGit;
use orion_core::test_runner::PythonTester;
use orion_core::workflow::{
    Collaborators, FileCheckpointStore, Orchestrator, PullRequestCreator, Status, WorkflowInputs,
    WorkflowState,
};
use orion_core::{Config, Secrets};
use orion_github::GitHubPullRequests;

pub use config::ConfigArgs;
pub use inspect::{ClassifyArgs, ScanArgs};
pub use message::MessageArgs;
pub use resume::ResumeArgs;
pub use run::RunArgs;

/// Flags shared by every command that starts a workflow
#[derive(Args, Debug, Clone, Default)]
pub struct WorkflowFlags {
    /// Parent directory for repository clones
    #[arg(short = 'd', long)]
    pub workdir: Option<PathBuf>,

    /// Skip environment setup and testing
    #[arg(long)]
    pub no_testing: bool,

    /// Use conda instead of a per-repository virtual environment
    #[arg(long)]
    pub no_venv: bool,

    /// Conda environment used with --no-venv
    #[arg(long)]
    pub conda_env: Option<String>,

    /// Abort the run when generated code fails its tests
    #[arg(long)]
    pub strict_testing: bool,

    /// Commit the generated changes
    #[arg(long)]
    pub commit: bool,

    /// Push the branch and open a pull request (implies --commit)
    #[arg(long)]
    pub create_pr: bool,

    /// Session id for checkpoints (generated when omitted)
    #[arg(long)]
    pub session_id: Option<String>,
}

impl WorkflowFlags {
    pub fn workdir(&self, config: &Config) -> anyhow::Result<PathBuf> {
        let dir = match &self.workdir {
            Some(dir) => dir.clone(),
            None => config.workdir().context("Failed to resolve working directory")?,
        };
        let dir = if dir.is_absolute() {
            dir
        } else {
            std::env::current_dir()?.join(dir)
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir)
    }

    pub fn inputs(
        &self,
        repo_url: &str,
        branch: &str,
        prompt: &str,
        workdir: PathBuf,
        config: &Config,
    ) -> WorkflowInputs {
        let mut inputs = WorkflowInputs::new(repo_url, prompt, workdir);
        inputs.branch = branch.to_string();
        inputs.enable_testing = !self.no_testing;
        inputs.create_venv = !self.no_venv;
        inputs.conda_env = self
            .conda_env
            .clone()
            .unwrap_or_else(|| config.testing.conda_env.clone());
        inputs.strict_testing = self.strict_testing;
        inputs.commit_changes = self.commit;
        inputs.create_pr = self.create_pr;
        inputs.normalized()
    }
}

/// Chat model client from configuration and secrets
pub fn chat_model(config: &Config, secrets: &Secrets) -> anyhow::Result<Arc<dyn ChatModel>> {
    let key = secrets.llm_api_key().context(
        "LLM API key not found. Set OPENAI_API_KEY environment variable \
         or add api_key to ~/.config/orion/secrets.toml",
    )?;
    Ok(Arc::new(LlmClient::new(&key, &config.llm)))
}

/// Wire the local collaborators into an orchestrator
pub fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let secrets = Secrets::load().context("Failed to load secrets")?;
    let model = chat_model(config, &secrets)?;

    let pull_requests = GitHubPullRequests::from_secrets(&secrets)
        .map(|creator| Arc::new(creator) as Arc<dyn PullRequestCreator>);
    if pull_requests.is_none() {
        tracing::debug!("No GitHub token configured; pull requests disabled");
    }

    let collaborators = Collaborators {
        vcs: Arc::new(LocalGit),
        generator: Arc::new(LlmGenerator::new(model)),
        environments: Arc::new(LocalEnvironments::new(config.testing.python.clone())),
        tester: Arc::new(PythonTester::new().with_timeout(config.testing.timeout)),
        pull_requests,
    };

    let mut orchestrator =
        Orchestrator::new(collaborators).with_max_retries(config.workflow.max_retries);
    if let Some(dir) = &config.workflow.checkpoint_dir {
        orchestrator = orchestrator.with_checkpoints(Arc::new(FileCheckpointStore::new(dir)));
    }
    Ok(orchestrator)
}

/// Print the final summary and map the status to an exit code
pub fn report(state: &WorkflowState) -> ExitCode {
    println!();
    println!("{}", state.summary());

    if state.status == Status::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_inputs() {
        let config = Config::default();
        let flags = WorkflowFlags {
            no_venv: true,
            create_pr: true,
            ..Default::default()
        };

        let inputs = flags.inputs("acme/tools", "dev", "Add a helper", "/tmp/w".into(), &config);
        assert_eq!(inputs.branch, "dev");
        assert!(inputs.enable_testing);
        assert!(!inputs.create_venv);
        assert_eq!(inputs.conda_env, "ml");
        assert!(inputs.create_pr);
        assert!(inputs.commit_changes);
    }

    #[test]
    fn test_conda_env_flag_overrides_config() {
        let mut config = Config::default();
        config.testing.conda_env = "py311".to_string();

        let flags = WorkflowFlags::default();
        let inputs = flags.inputs("acme/tools", "main", "x", "/tmp/w".into(), &config);
        assert_eq!(inputs.conda_env, "py311");

        let flags = WorkflowFlags {
            conda_env: Some("ml2".to_string()),
            no_testing: true,
            ..Default::default()
        };
        let inputs = flags.inputs("acme/tools", "main", "x", "/tmp/w".into(), &config);
        assert_eq!(inputs.conda_env, "ml2");
        assert!(!inputs.enable_testing);
        assert!(!inputs.commit_changes);
    }
}
