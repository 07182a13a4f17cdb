//! Opening pull requests

use async_trait::async_trait;
use orion_core::workflow::PullRequestCreator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, GitHubClient, Result};

/// A pull request that was just opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: u64,
    /// Browser URL of the pull request
    pub url: String,
    pub head: String,
    pub base: String,
}

impl GitHubClient {
    /// Open a pull request from `head` into `base`
    pub async fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<PullRequestInfo> {
        debug!(owner = %self.owner(), repo = %self.repo(), head, base, "Creating pull request");

        let pr = self
            .client()
            .pulls(self.owner(), self.repo())
            .create(title, head, base)
            .body(body)
            .send()
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { source, .. }
                    if source.message.contains("Validation Failed")
                        || source.message.contains("already exists") =>
                {
                    Error::Rejected(source.message)
                }
                other => Error::Api(other),
            })?;

        let url = pr
            .html_url
            .map(|u| u.to_string())
            .unwrap_or_else(|| pull_url(self.owner(), self.repo(), pr.number));

        info!(number = pr.number, url = %url, "Created pull request");

        Ok(PullRequestInfo {
            number: pr.number,
            url,
            head: head.to_string(),
            base: base.to_string(),
        })
    }
}

fn pull_url(owner: &str, repo: &str, number: u64) -> String {
    format!("https://github.com/{}/{}/pull/{}", owner, repo, number)
}

/// Pull request collaborator for the workflow
///
/// Holds only the token; a client is built per repository when a pull
/// request is opened.
#[derive(Clone)]
pub struct GitHubPullRequests {
    token: String,
}

impl GitHubPullRequests {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// `None` when no GitHub token is configured
    pub fn from_secrets(secrets: &orion_core::Secrets) -> Option<Self> {
        secrets.github_token().map(Self::new)
    }
}

impl std::fmt::Debug for GitHubPullRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubPullRequests").finish_non_exhaustive()
    }
}

#[async_trait]
impl PullRequestCreator for GitHubPullRequests {
    async fn create_pull_request(
        &self,
        repo_url: &str,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> orion_core::Result<String> {
        let client = GitHubClient::from_url(repo_url, &self.token)?;
        let info = client.create_pull_request(title, body, head, base).await?;
        Ok(info.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_url() {
        assert_eq!(
            pull_url("acme", "tools", 7),
            "https://github.com/acme/tools/pull/7"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let creator = GitHubPullRequests::new("ghp_secret");
        assert!(!format!("{:?}", creator).contains("ghp_secret"));
    }

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let creator = GitHubPullRequests::new("token");
        let err = creator
            .create_pull_request("not a repo", "t", "b", "orion/x", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, orion_core::Error::Other(_)));
        assert!(err.to_string().contains("Parse error"));
    }

    #[test]
    fn test_error_maps_to_core() {
        let err: orion_core::Error = Error::Rejected("already exists".to_string()).into();
        assert_eq!(err.to_string(), "Pull request rejected: already exists");
    }
}
