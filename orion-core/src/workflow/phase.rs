//! Phase and status identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Analysis,
    Classification,
    Scan,
    RepoSetup,
    Generation,
    EnvironmentSetup,
    Testing,
    Commit,
    PullRequest,
    ErrorRecovery,
    /// Reserved for concurrent execution of independent phases; currently a
    /// passthrough that no route targets
    ParallelCoordination,
}

impl PhaseId {
    /// Phase every run starts in
    pub const INITIAL: PhaseId = PhaseId::Analysis;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analysis => "analysis",
            Self::Classification => "classification",
            Self::Scan => "scan",
            Self::RepoSetup => "repo_setup",
            Self::Generation => "generation",
            Self::EnvironmentSetup => "environment_setup",
            Self::Testing => "testing",
            Self::Commit => "commit",
            Self::PullRequest => "pull_request",
            Self::ErrorRecovery => "error_recovery",
            Self::ParallelCoordination => "parallel_coordination",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Analysis => "Task analysis",
            Self::Classification => "Task classification",
            Self::Scan => "Repository scan",
            Self::RepoSetup => "Repository setup",
            Self::Generation => "Code generation",
            Self::EnvironmentSetup => "Environment setup",
            Self::Testing => "Testing",
            Self::Commit => "Commit",
            Self::PullRequest => "Pull request",
            Self::ErrorRecovery => "Error recovery",
            Self::ParallelCoordination => "Parallel coordination",
        }
    }

    /// Phases the router may move to from this one
    pub fn successors(&self) -> &'static [PhaseId] {
        use PhaseId::*;
        match self {
            Analysis => &[Classification, ErrorRecovery],
            Classification => &[RepoSetup, ErrorRecovery],
            RepoSetup => &[Scan, Generation, ErrorRecovery],
            Scan => &[Generation, ErrorRecovery],
            Generation => &[EnvironmentSetup, Commit, ErrorRecovery],
            EnvironmentSetup => &[Testing],
            Testing => &[Commit, ErrorRecovery],
            Commit => &[PullRequest, ErrorRecovery],
            PullRequest => &[],
            ErrorRecovery => &[Analysis, Generation, EnvironmentSetup],
            ParallelCoordination => &[],
        }
    }

    /// Check whether the router may move from this phase to `to`
    pub fn can_transition_to(&self, to: PhaseId) -> bool {
        self.successors().contains(&to)
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Run status, set by the phase that ran last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Initializing,
    Analyzing,
    PlanningComplete,
    TaskClassified,
    RepositoryScanned,
    RepoReady,
    CodeGenerated,
    EnvironmentReady,
    TestsComplete,
    TestsSkipped,
    Committed,
    CommitSkipped,
    /// The last phase failed
    Error,
    /// Error recovery scheduled another attempt
    Retrying,
    ParallelCoordination,
    Completed,
    Failed,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Analyzing => "analyzing",
            Self::PlanningComplete => "planning_complete",
            Self::TaskClassified => "task_classified",
            Self::RepositoryScanned => "repository_scanned",
            Self::RepoReady => "repo_ready",
            Self::CodeGenerated => "code_generated",
            Self::EnvironmentReady => "environment_ready",
            Self::TestsComplete => "tests_complete",
            Self::TestsSkipped => "tests_skipped",
            Self::Committed => "committed",
            Self::CommitSkipped => "commit_skipped",
            Self::Error => "error",
            Self::Retrying => "retrying",
            Self::ParallelCoordination => "parallel_coordination",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the router sends the run next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Phase(PhaseId),
    Completed,
    Failed,
}
