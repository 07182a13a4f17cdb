//! Sequential driver for the workflow
//!
//! Each phase delegates to one collaborator and records its result on the
//! state. A failing phase never aborts the driver: the error is written to
//! the state and routing decides whether to retry, continue or stop.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use super::collaborators::Collaborators;
use super::phase::{Next, PhaseId, Status};
use super::routing::route;
use super::state::{CommitInfo, WorkflowInputs, WorkflowState};
use crate::classify::{classify, suggest_target_files, validate_files, PARALLEL_HINTS};
use crate::generate::GenerationContext;
use crate::git::{commit_message, RepoUrl};
use crate::scan::scan_repository;
use crate::{Error, Result};

/// Retry ceiling used unless configured otherwise
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Hard stop on phase executions per run
pub const DEFAULT_MAX_STEPS: usize = 64;

/// Body of the pull request opened for an instruction
pub fn pull_request_body(prompt: &str) -> String {
    format!(
        "This PR contains AI-generated changes for: {}\n\nGenerated by Orion AI Agent",
        prompt
    )
}

/// Drives one workflow run at a time over a set of collaborators
pub struct Orchestrator {
    collaborators: Collaborators,
    checkpoints: Arc<dyn CheckpointStore>,
    max_retries: u32,
    max_steps: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("collaborators", &self.collaborators)
            .field("max_retries", &self.max_retries)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            checkpoints: Arc::new(MemoryCheckpointStore::new()),
            max_retries: DEFAULT_MAX_RETRIES,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_checkpoints(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = store;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    /// Run a new session to completion
    ///
    /// A fresh session id is generated unless one is given. The returned state
    /// is always terminal (`completed` or `failed`).
    pub async fn run(&self, inputs: WorkflowInputs, session_id: Option<String>) -> WorkflowState {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let state = WorkflowState::new(session_id, inputs);

        tracing::info!(
            session_id = %state.session_id,
            repo = %state.inputs.repo_url,
            prompt = %state.inputs.prompt,
            "Starting workflow"
        );
        self.drive(state, Next::Phase(PhaseId::INITIAL)).await
    }

    /// Continue a checkpointed session from the phase after its last one
    pub async fn resume(&self, session_id: &str) -> Result<WorkflowState> {
        let state = self
            .checkpoints
            .load(session_id)?
            .ok_or_else(|| Error::Config(format!("No checkpoint for session {}", session_id)))?;

        if state.status.is_terminal() {
            tracing::info!(session_id, status = %state.status, "Session already finished");
            return Ok(state);
        }

        let next = route(state.current_phase, &state);
        tracing::info!(session_id, from = ?state.current_phase, to = ?next, "Resuming workflow");
        Ok(self.drive(state, next).await)
    }

    async fn drive(&self, mut state: WorkflowState, first: Next) -> WorkflowState {
        let mut next = first;
        let mut steps = 0;

        while let Next::Phase(phase) = next {
            if steps >= self.max_steps {
                tracing::error!(session_id = %state.session_id, steps, "Step limit reached");
                state.error = Some(format!("Workflow exceeded {} steps", self.max_steps));
                next = Next::Failed;
                break;
            }
            steps += 1;

            self.execute(phase, &mut state).await;
            self.checkpoint(&state);

            next = route(phase, &state);
            if let Next::Phase(to) = next {
                tracing::info!(from = ?phase, to = ?to, "Workflow phase transition");
            }
        }

        state.status = match next {
            Next::Failed => Status::Failed,
            _ => Status::Completed,
        };
        state.finish();
        self.checkpoint(&state);

        tracing::info!(
            session_id = %state.session_id,
            status = %state.status,
            retries = state.retry_count,
            duration_ms = state.duration_ms,
            "Workflow finished"
        );
        state
    }

    fn checkpoint(&self, state: &WorkflowState) {
        if let Err(e) = self.checkpoints.save(state) {
            tracing::warn!(session_id = %state.session_id, error = %e, "Failed to save checkpoint");
        }
    }

    /// Run one phase; failures are recorded on the state, never returned
    async fn execute(&self, phase: PhaseId, state: &mut WorkflowState) {
        state.current_phase = phase;
        tracing::debug!(session_id = %state.session_id, phase = %phase, "Running phase");

        let result = match phase {
            PhaseId::Analysis => self.analysis(state),
            PhaseId::Classification => self.classification(state),
            PhaseId::Scan => self.scan(state).await,
            PhaseId::RepoSetup => self.repo_setup(state).await,
            PhaseId::Generation => self.generation(state).await,
            PhaseId::EnvironmentSetup => self.environment_setup(state).await,
            PhaseId::Testing => self.testing(state).await,
            PhaseId::Commit => self.commit(state).await,
            PhaseId::PullRequest => self.pull_request(state).await,
            PhaseId::ErrorRecovery => self.error_recovery(state),
            PhaseId::ParallelCoordination => {
                state.status = Status::ParallelCoordination;
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(
                session_id = %state.session_id,
                phase = %phase,
                error = %e,
                "Phase failed"
            );
            state.fail(phase, format!("{} failed: {}", phase.description(), e));
        }
    }

    fn analysis(&self, state: &mut WorkflowState) -> Result<()> {
        state.status = Status::Analyzing;

        if state.inputs.repo_url.trim().is_empty() {
            return Err(Error::Config("Repository URL is required".to_string()));
        }
        if state.inputs.prompt.trim().is_empty() {
            return Err(Error::Config("Instruction is required".to_string()));
        }

        let lower = state.inputs.prompt.to_lowercase();
        if PARALLEL_HINTS.iter().any(|hint| lower.contains(hint)) {
            state.parallel_tasks = vec![
                PhaseId::EnvironmentSetup.as_str().to_string(),
                "code_analysis".to_string(),
            ];
            tracing::info!(tasks = ?state.parallel_tasks, "Task flagged for parallel work");
        }

        state.complete(PhaseId::Analysis, Status::PlanningComplete);
        Ok(())
    }

    fn classification(&self, state: &mut WorkflowState) -> Result<()> {
        let classification = classify(&state.inputs.prompt, state.scan.as_ref());
        tracing::info!(
            action = %classification.primary_action,
            task_type = %classification.task_type,
            files = ?classification.mentioned_files,
            requires_scan = classification.requires_repository_scan,
            "Task classified"
        );
        state.classification = Some(classification);
        state.complete(PhaseId::Classification, Status::TaskClassified);
        Ok(())
    }

    async fn repo_setup(&self, state: &mut WorkflowState) -> Result<()> {
        if let (Some(path), Some(branch)) = (&state.repo_path, &state.branch_name) {
            tracing::info!(path = %path.display(), branch = %branch, "Reusing repository");
            state.complete(PhaseId::RepoSetup, Status::RepoReady);
            return Ok(());
        }

        let url = RepoUrl::parse(&state.inputs.repo_url)?;
        let path = state
            .inputs
            .workdir
            .join(url.clone_dir_name(&state.session_id));
        let vcs = &self.collaborators.vcs;

        vcs.clone_repo(
            &state.inputs.repo_url,
            &path,
            Some(state.inputs.branch.as_str()),
        )
        .await?;

        let base = format!("ai-update-{}-{}", url.repo, Utc::now().timestamp());
        let branch = vcs.create_unique_branch(&path, &base).await?;
        vcs.checkout(&path, &branch).await?;

        tracing::info!(path = %path.display(), branch = %branch, "Repository ready");
        state.repo_path = Some(path);
        state.branch_name = Some(branch);
        state.complete(PhaseId::RepoSetup, Status::RepoReady);
        Ok(())
    }

    async fn scan(&self, state: &mut WorkflowState) -> Result<()> {
        let root = require_repo(state)?;
        let scan = tokio::task::spawn_blocking(move || scan_repository(root))
            .await
            .map_err(|e| Error::Other(format!("Scan task panicked: {}", e)))??;

        tracing::info!(
            files = scan.total_files(),
            python_files = scan.python_files.len(),
            candidates = scan.modification_candidates.len(),
            "Repository scanned"
        );
        state.scan = Some(scan);
        state.complete(PhaseId::Scan, Status::RepositoryScanned);
        Ok(())
    }

    async fn generation(&self, state: &mut WorkflowState) -> Result<()> {
        let repo = require_repo(state)?;
        let context = generation_context(state);

        let outcome = self
            .collaborators
            .generator
            .generate(&state.inputs.prompt, &repo, &context)
            .await?;

        if outcome.created_files.is_empty() && outcome.modified_files.is_empty() {
            return Err(Error::Generation("No files were produced".to_string()));
        }

        tracing::info!(
            created = ?outcome.created_files,
            modified = ?outcome.modified_files,
            confidence = outcome.confidence,
            "Code generated"
        );
        state.created_files = outcome.created_files.clone();
        state.modified_files = outcome.modified_files.clone();
        state.generation = Some(outcome);
        state.complete(PhaseId::Generation, Status::CodeGenerated);
        Ok(())
    }

    async fn environment_setup(&self, state: &mut WorkflowState) -> Result<()> {
        let repo = require_repo(state)?;
        let env = self
            .collaborators
            .environments
            .prepare(&repo, state.inputs.create_venv, &state.inputs.conda_env)
            .await?;

        tracing::info!(env = %env.label(), "Environment ready");
        state.environment = Some(env);
        state.complete(PhaseId::EnvironmentSetup, Status::EnvironmentReady);
        Ok(())
    }

    async fn testing(&self, state: &mut WorkflowState) -> Result<()> {
        let repo = require_repo(state)?;
        let files: Vec<String> = state
            .changed_files()
            .into_iter()
            .filter(|f| f.ends_with(".py"))
            .collect();

        if files.is_empty() {
            tracing::info!("No Python files to test");
            state.status = Status::TestsSkipped;
            return Ok(());
        }

        let env = state
            .environment
            .clone()
            .ok_or_else(|| Error::Test("No environment was prepared".to_string()))?;
        let report = self.collaborators.tester.run(&repo, &env, &files).await?;

        let passed = report.all_passed;
        let summary = report.summary();
        state.test_report = Some(report);

        if !passed {
            return Err(Error::Test(format!("Tests failed: {}", summary)));
        }

        tracing::info!(summary = %summary, "Tests passed");
        state.complete(PhaseId::Testing, Status::TestsComplete);
        Ok(())
    }

    async fn commit(&self, state: &mut WorkflowState) -> Result<()> {
        if !state.inputs.commit_changes {
            tracing::info!("Commit skipped");
            state.status = Status::CommitSkipped;
            return Ok(());
        }

        let repo = require_repo(state)?;
        let branch = require_branch(state)?;
        let message = commit_message(&state.inputs.prompt);

        let committed = self.collaborators.vcs.commit(&repo, &message).await?;
        if !committed {
            tracing::warn!("Nothing to commit");
        }

        state.commit = Some(CommitInfo {
            message,
            branch,
            committed,
        });
        state.complete(PhaseId::Commit, Status::Committed);
        Ok(())
    }

    async fn pull_request(&self, state: &mut WorkflowState) -> Result<()> {
        debug_assert!(state.inputs.create_pr, "pull request phase routed without create_pr");

        let creator = self.collaborators.pull_requests.as_ref().ok_or_else(|| {
            Error::Config("GitHub token is not configured; cannot open a pull request".to_string())
        })?;
        let repo = require_repo(state)?;
        let branch = require_branch(state)?;

        self.collaborators.vcs.push(&repo, &branch).await?;

        let url = creator
            .create_pull_request(
                &state.inputs.repo_url,
                &commit_message(&state.inputs.prompt),
                &pull_request_body(&state.inputs.prompt),
                &branch,
                &state.inputs.branch,
            )
            .await?;

        tracing::info!(url = %url, "Pull request created");
        state.pr_url = Some(url);
        state.complete(PhaseId::PullRequest, Status::Completed);
        Ok(())
    }

    fn error_recovery(&self, state: &mut WorkflowState) -> Result<()> {
        state.retry_count += 1;

        if state.retry_count < self.max_retries {
            tracing::warn!(
                session_id = %state.session_id,
                retry_count = state.retry_count,
                failed_phase = ?state.last_failed(),
                error = ?state.error,
                "Retrying after failure"
            );
            state.error = None;
            state.status = Status::Retrying;
        } else {
            tracing::error!(
                session_id = %state.session_id,
                retry_count = state.retry_count,
                error = ?state.error,
                "Retry limit reached"
            );
            state.status = Status::Failed;
        }
        Ok(())
    }
}

fn require_repo(state: &WorkflowState) -> Result<PathBuf> {
    state
        .repo_path
        .clone()
        .ok_or_else(|| Error::Config("Repository path is not set".to_string()))
}

fn require_branch(state: &WorkflowState) -> Result<String> {
    state
        .branch_name
        .clone()
        .ok_or_else(|| Error::Config("Working branch is not set".to_string()))
}

/// Classification refined by the scan, plus the scan summary
fn generation_context(state: &WorkflowState) -> GenerationContext {
    let mut classification = state.classification.clone();
    if let (Some(c), Some(scan)) = (classification.as_mut(), state.scan.as_ref()) {
        c.mentioned_files = validate_files(c, scan);
        c.target_files = suggest_target_files(c, Some(scan));
    }

    GenerationContext {
        classification,
        scan_lines: state
            .scan
            .as_ref()
            .map(|s| s.context_lines())
            .unwrap_or_default(),
    }
}
