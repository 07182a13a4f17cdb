//! Orion Core - an AI coding agent driven by a workflow state machine
//!
//! A run clones a repository, classifies the instruction, optionally scans
//! the tree, generates code with an LLM, tests it, and commits or opens a
//! pull request. The [`workflow`] module owns sequencing and retries; every
//! other module is a collaborator it drives.

pub mod classify;
pub mod config;
pub mod env;
pub mod error;
pub mod explain;
pub mod generate;
pub mod git;
pub mod request;
pub mod scan;
pub mod secrets;
pub mod test_runner;
pub mod workflow;

pub use config::Config;
pub use error::{Error, Result};
pub use secrets::Secrets;
