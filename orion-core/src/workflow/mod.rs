//! Workflow state machine driving one instruction from clone to pull request
//!
//! The [`Orchestrator`] runs phases in sequence over a [`WorkflowState`],
//! delegating real work to [`Collaborators`] and choosing the next phase
//! with [`route`].

mod checkpoint;
mod collaborators;
mod orchestrator;
mod phase;
mod routing;
mod state;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use collaborators::{
    CodeGenerator, CodeTester, Collaborators, EnvironmentProvider, PullRequestCreator,
    VersionControl,
};
pub use orchestrator::{pull_request_body, Orchestrator, DEFAULT_MAX_RETRIES, DEFAULT_MAX_STEPS};
pub use phase::{Next, PhaseId, Status};
pub use routing::route;
pub use state::{CommitInfo, WorkflowInputs, WorkflowState, WorkflowSummary};
