//! Git operations for Orion
//!
//! Reads (branches, status) go through git2; clone, commit and push shell out
//! to the git CLI so the user's credentials and identity apply.

mod clone;
mod repo;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::workflow::VersionControl;
use crate::{Error, Result};

pub use clone::{clone_or_update, RepoUrl};
pub use repo::{commit_message, unique_branch_name, GitRepo, RepoStatus, BRANCH_PREFIX};

/// Version-control collaborator backed by the local git installation
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGit;

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Git(format!("Git task panicked: {}", e)))?
}

#[async_trait]
impl VersionControl for LocalGit {
    async fn clone_repo(&self, url: &str, path: &Path, branch: Option<&str>) -> Result<()> {
        let url = RepoUrl::parse(url)?;
        let path = path.to_path_buf();
        let branch = branch.map(str::to_string);
        blocking(move || clone_or_update(&url, &path, branch.as_deref())).await
    }

    async fn create_unique_branch(&self, repo: &Path, base: &str) -> Result<String> {
        let (repo, base) = (owned(repo), base.to_string());
        blocking(move || GitRepo::open(&repo)?.create_unique_branch(&base)).await
    }

    async fn checkout(&self, repo: &Path, branch: &str) -> Result<()> {
        let (repo, branch) = (owned(repo), branch.to_string());
        blocking(move || GitRepo::open(&repo)?.checkout_branch(&branch)).await
    }

    async fn commit(&self, repo: &Path, message: &str) -> Result<bool> {
        let (repo, message) = (owned(repo), message.to_string());
        blocking(move || GitRepo::open(&repo)?.commit_all(&message)).await
    }

    async fn push(&self, repo: &Path, branch: &str) -> Result<()> {
        let (repo, branch) = (owned(repo), branch.to_string());
        blocking(move || GitRepo::open(&repo)?.push_branch(&branch)).await
    }

    async fn status(&self, repo: &Path) -> Result<RepoStatus> {
        let repo = owned(repo);
        blocking(move || GitRepo::open(&repo)?.status()).await
    }
}

fn owned(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_git_branch_and_status() {
        let (dir, _repo) = repo::tests::init_repo();
        let git = LocalGit;

        let branch = git.create_unique_branch(dir.path(), "task").await.unwrap();
        assert_eq!(branch, "orion/task");
        git.checkout(dir.path(), &branch).await.unwrap();

        let status = git.status(dir.path()).await.unwrap();
        assert_eq!(status.branch.as_deref(), Some("orion/task"));
        assert!(!status.has_changes);
    }

    #[tokio::test]
    async fn test_local_git_rejects_bad_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = LocalGit
            .clone_repo("not a url", &dir.path().join("x"), None)
            .await;
        assert!(result.is_err());
    }
}
