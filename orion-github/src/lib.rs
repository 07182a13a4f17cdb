//! Orion GitHub - pull request creation for the Orion coding agent
//!
//! Wraps octocrab behind the core [`PullRequestCreator`] interface so the
//! workflow can open pull requests without knowing about the GitHub API.
//!
//! [`PullRequestCreator`]: orion_core::workflow::PullRequestCreator

mod client;
mod error;
mod pr;

pub use client::{parse_github_url, GitHubClient};
pub use error::{Error, Result};
pub use pr::{GitHubPullRequests, PullRequestInfo};
