//! The record threaded through every phase

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::{PhaseId, Status};
use crate::classify::TaskClassification;
use crate::env::Environment;
use crate::generate::GenerationOutcome;
use crate::scan::RepositoryScan;
use crate::test_runner::TestReport;

/// Caller-supplied parameters, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInputs {
    pub repo_url: String,
    pub prompt: String,
    /// Parent directory for the session's clone
    pub workdir: PathBuf,
    /// Branch to clone and to target with the pull request
    pub branch: String,
    pub enable_testing: bool,
    /// Use a per-repository virtual environment instead of conda
    pub create_venv: bool,
    pub conda_env: String,
    /// Test failures abort instead of being recorded
    pub strict_testing: bool,
    pub commit_changes: bool,
    pub create_pr: bool,
}

impl WorkflowInputs {
    /// Inputs with defaults: branch `main`, testing in a venv, no commit, no PR
    pub fn new(
        repo_url: impl Into<String>,
        prompt: impl Into<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo_url: repo_url.into(),
            prompt: prompt.into(),
            workdir: workdir.into(),
            branch: "main".to_string(),
            enable_testing: true,
            create_venv: true,
            conda_env: "ml".to_string(),
            strict_testing: false,
            commit_changes: false,
            create_pr: false,
        }
    }

    /// Apply flag implications: a pull request needs a commit
    pub fn normalized(mut self) -> Self {
        if self.create_pr {
            self.commit_changes = true;
        }
        self
    }
}

/// What the commit phase produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub message: String,
    pub branch: String,
    /// False when the tree was already clean
    pub committed: bool,
}

/// Mutable state of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    pub inputs: WorkflowInputs,

    pub classification: Option<TaskClassification>,
    pub scan: Option<RepositoryScan>,
    /// Set once by repository setup
    pub repo_path: Option<PathBuf>,
    /// Set once by repository setup
    pub branch_name: Option<String>,
    pub generation: Option<GenerationOutcome>,
    pub created_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub environment: Option<Environment>,
    pub test_report: Option<TestReport>,
    pub commit: Option<CommitInfo>,
    pub pr_url: Option<String>,
    /// Independent work the analysis phase flagged for concurrent execution
    pub parallel_tasks: Vec<String>,

    pub current_phase: PhaseId,
    pub status: Status,
    pub completed_phases: Vec<PhaseId>,
    pub failed_phases: Vec<PhaseId>,
    pub retry_count: u32,
    pub error: Option<String>,

    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
}

impl WorkflowState {
    pub fn new(session_id: impl Into<String>, inputs: WorkflowInputs) -> Self {
        Self {
            session_id: session_id.into(),
            inputs: inputs.normalized(),
            classification: None,
            scan: None,
            repo_path: None,
            branch_name: None,
            generation: None,
            created_files: Vec::new(),
            modified_files: Vec::new(),
            environment: None,
            test_report: None,
            commit: None,
            pr_url: None,
            parallel_tasks: Vec::new(),
            current_phase: PhaseId::INITIAL,
            status: Status::Initializing,
            completed_phases: Vec::new(),
            failed_phases: Vec::new(),
            retry_count: 0,
            error: None,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
        }
    }

    /// Record a successful phase; a phase is listed once however often it ran
    pub fn complete(&mut self, phase: PhaseId, status: Status) {
        self.status = status;
        if !self.completed_phases.contains(&phase) {
            self.completed_phases.push(phase);
        }
    }

    /// Record a failed phase
    pub fn fail(&mut self, phase: PhaseId, message: impl Into<String>) {
        self.error = Some(message.into());
        self.status = Status::Error;
        self.failed_phases.push(phase);
    }

    /// Most recent failure, if any
    pub fn last_failed(&self) -> Option<PhaseId> {
        self.failed_phases.last().copied()
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Stamp end time and duration
    pub fn finish(&mut self) {
        let end = Utc::now();
        self.duration_ms = Some((end - self.start_time).num_milliseconds().max(0) as u64);
        self.end_time = Some(end);
    }

    /// Files that generation created or changed
    pub fn changed_files(&self) -> Vec<String> {
        let mut files = self.created_files.clone();
        for file in &self.modified_files {
            if !files.contains(file) {
                files.push(file.clone());
            }
        }
        files
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            session_id: self.session_id.clone(),
            status: self.status,
            completed_phases: self.completed_phases.clone(),
            failed_phases: self.failed_phases.clone(),
            retry_count: self.retry_count,
            error: self.error.clone(),
            pr_url: self.pr_url.clone(),
            branch_name: self.branch_name.clone(),
            created_files: self.created_files.clone(),
            modified_files: self.modified_files.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Final outcome of a run, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub session_id: String,
    pub status: Status,
    pub completed_phases: Vec<PhaseId>,
    pub failed_phases: Vec<PhaseId>,
    pub retry_count: u32,
    pub error: Option<String>,
    pub pr_url: Option<String>,
    pub branch_name: Option<String>,
    pub created_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub duration_ms: Option<u64>,
}

fn join(phases: &[PhaseId]) -> String {
    if phases.is_empty() {
        return "(none)".to_string();
    }
    phases
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for WorkflowSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session:   {}", self.session_id)?;
        writeln!(f, "Status:    {}", self.status)?;
        writeln!(f, "Completed: {}", join(&self.completed_phases))?;
        writeln!(f, "Failed:    {}", join(&self.failed_phases))?;
        if self.retry_count > 0 {
            writeln!(f, "Retries:   {}", self.retry_count)?;
        }
        if let Some(branch) = &self.branch_name {
            writeln!(f, "Branch:    {}", branch)?;
        }
        for file in &self.created_files {
            writeln!(f, "Created:   {}", file)?;
        }
        for file in &self.modified_files {
            writeln!(f, "Modified:  {}", file)?;
        }
        if let Some(url) = &self.pr_url {
            writeln!(f, "PR:        {}", url)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error:     {}", error)?;
        }
        if let Some(ms) = self.duration_ms {
            write!(f, "Duration:  {:.1}s", ms as f64 / 1000.0)?;
        }
        Ok(())
    }
}
