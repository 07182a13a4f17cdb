//! Interfaces to the systems the orchestrator drives
//!
//! Collaborators receive scalar parameters and return new data. They never
//! see the workflow state.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::env::Environment;
use crate::generate::{GenerationContext, GenerationOutcome};
use crate::git::RepoStatus;
use crate::test_runner::TestReport;
use crate::Result;

/// Clone, branch, commit and push
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Clone `url` into `path`, or refresh an existing clone
    async fn clone_repo(&self, url: &str, path: &Path, branch: Option<&str>) -> Result<()>;

    /// Create a branch that collides with no local or remote branch
    async fn create_unique_branch(&self, repo: &Path, base: &str) -> Result<String>;

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Stage and commit everything; `false` when there was nothing to commit
    async fn commit(&self, repo: &Path, message: &str) -> Result<bool>;

    async fn push(&self, repo: &Path, branch: &str) -> Result<()>;

    async fn status(&self, repo: &Path) -> Result<RepoStatus>;
}

/// Produce code for an instruction and write it into the repository
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        repo: &Path,
        context: &GenerationContext,
    ) -> Result<GenerationOutcome>;
}

/// Prepare an interpreter for generated code
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    async fn prepare(&self, repo: &Path, create_venv: bool, conda_env: &str)
        -> Result<Environment>;
}

/// Syntax-check and run generated files
#[async_trait]
pub trait CodeTester: Send + Sync {
    async fn run(&self, repo: &Path, env: &Environment, files: &[String]) -> Result<TestReport>;
}

/// Open a pull request and return its URL
#[async_trait]
pub trait PullRequestCreator: Send + Sync {
    async fn create_pull_request(
        &self,
        repo_url: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<String>;
}

/// The full set of collaborators for one orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub vcs: Arc<dyn VersionControl>,
    pub generator: Arc<dyn CodeGenerator>,
    pub environments: Arc<dyn EnvironmentProvider>,
    pub tester: Arc<dyn CodeTester>,
    /// `None` when no GitHub credentials are configured
    pub pull_requests: Option<Arc<dyn PullRequestCreator>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("pull_requests", &self.pull_requests.is_some())
            .finish_non_exhaustive()
    }
}
