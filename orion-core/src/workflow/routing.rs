//! Routing between phases
//!
//! Each function inspects the state left by the phase that just ran and
//! names what runs next. None of them mutate state.

use super::phase::{Next, PhaseId, Status};
use super::state::WorkflowState;

/// Next step after `phase` has run
pub fn route(phase: PhaseId, state: &WorkflowState) -> Next {
    match phase {
        PhaseId::Analysis => or_recover(state, PhaseId::Classification),
        PhaseId::Classification => or_recover(state, PhaseId::RepoSetup),
        PhaseId::RepoSetup => after_repo_setup(state),
        PhaseId::Scan => or_recover(state, PhaseId::Generation),
        PhaseId::Generation => after_generation(state),
        PhaseId::EnvironmentSetup => Next::Phase(PhaseId::Testing),
        PhaseId::Testing => after_testing(state),
        PhaseId::Commit => after_commit(state),
        PhaseId::PullRequest => after_pull_request(state),
        PhaseId::ErrorRecovery => after_error_recovery(state),
        PhaseId::ParallelCoordination => Next::Completed,
    }
}

fn or_recover(state: &WorkflowState, next: PhaseId) -> Next {
    if state.is_error() {
        Next::Phase(PhaseId::ErrorRecovery)
    } else {
        Next::Phase(next)
    }
}

fn after_repo_setup(state: &WorkflowState) -> Next {
    if state.is_error() {
        return Next::Phase(PhaseId::ErrorRecovery);
    }
    let scan_required = state
        .classification
        .as_ref()
        .is_some_and(|c| c.requires_repository_scan);
    if scan_required && state.scan.is_none() {
        Next::Phase(PhaseId::Scan)
    } else {
        Next::Phase(PhaseId::Generation)
    }
}

fn after_generation(state: &WorkflowState) -> Next {
    if state.is_error() {
        Next::Phase(PhaseId::ErrorRecovery)
    } else if !state.inputs.enable_testing {
        Next::Phase(PhaseId::Commit)
    } else {
        Next::Phase(PhaseId::EnvironmentSetup)
    }
}

fn after_testing(state: &WorkflowState) -> Next {
    if state.is_error() && state.inputs.strict_testing {
        return Next::Phase(PhaseId::ErrorRecovery);
    }
    if !state.inputs.commit_changes {
        Next::Completed
    } else {
        Next::Phase(PhaseId::Commit)
    }
}

fn after_commit(state: &WorkflowState) -> Next {
    if state.is_error() {
        Next::Phase(PhaseId::ErrorRecovery)
    } else if state.inputs.create_pr {
        Next::Phase(PhaseId::PullRequest)
    } else {
        Next::Completed
    }
}

fn after_pull_request(state: &WorkflowState) -> Next {
    if state.is_error() {
        Next::Failed
    } else {
        Next::Completed
    }
}

/// Restart from the narrowest phase that can redo the failed work
fn after_error_recovery(state: &WorkflowState) -> Next {
    if state.status == Status::Failed {
        return Next::Failed;
    }
    match state.last_failed() {
        Some(PhaseId::Generation) => Next::Phase(PhaseId::Generation),
        Some(PhaseId::Testing) => Next::Phase(PhaseId::EnvironmentSetup),
        _ => Next::Phase(PhaseId::Analysis),
    }
}
