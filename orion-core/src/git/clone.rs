//! Repository URL parsing and cloning

use std::path::Path;
use std::process::Command;

use crate::{Error, Result};

use super::repo::{run_git, GitRepo};

/// Parsed repository information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    /// Repository owner/organization
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Full clone URL
    pub clone_url: String,
    /// Host (e.g., "github.com")
    pub host: String,
}

impl RepoUrl {
    /// Parse a repository URL or shorthand
    ///
    /// Supports:
    /// - `https://github.com/owner/repo`
    /// - `https://github.com/owner/repo.git`
    /// - `git@github.com:owner/repo.git`
    /// - `owner/repo` (assumes GitHub)
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if !input.contains("://") && !input.contains('@') && input.contains('/') {
            let parts: Vec<&str> = input.split('/').collect();
            if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
                let owner = parts[0].to_string();
                let repo = parts[1].trim_end_matches(".git").to_string();
                return Ok(Self {
                    clone_url: format!("https://github.com/{}/{}.git", owner, repo),
                    owner,
                    repo,
                    host: "github.com".to_string(),
                });
            }
        }

        if let Some(rest) = input.strip_prefix("git@") {
            if let Some((host, path)) = rest.split_once(':') {
                let parts: Vec<&str> = path.trim_end_matches(".git").split('/').collect();
                if parts.len() >= 2 {
                    return Ok(Self {
                        owner: parts[0].to_string(),
                        repo: parts[1].to_string(),
                        clone_url: input.to_string(),
                        host: host.to_string(),
                    });
                }
            }
        }

        if input.starts_with("https://") || input.starts_with("http://") {
            if let Ok(url) = url::Url::parse(input) {
                let host = url.host_str().unwrap_or("").to_string();
                let path = url.path().trim_start_matches('/').trim_end_matches(".git");
                let parts: Vec<&str> = path.split('/').collect();

                if parts.len() >= 2 && !parts[1].is_empty() {
                    let clone_url = if input.ends_with(".git") {
                        input.to_string()
                    } else {
                        format!("{}.git", input.trim_end_matches('/'))
                    };

                    return Ok(Self {
                        owner: parts[0].to_string(),
                        repo: parts[1].to_string(),
                        clone_url,
                        host,
                    });
                }
            }
        }

        Err(Error::Config(format!(
            "Invalid repository URL: {}. Expected format: owner/repo, https://github.com/owner/repo, or git@github.com:owner/repo.git",
            input
        )))
    }

    /// Clone directory name, unique per session
    ///
    /// `<repo>-<first 8 alphanumerics of session_id>`
    pub fn clone_dir_name(&self, session_id: &str) -> String {
        let prefix: String = session_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(8)
            .collect();
        format!("{}-{}", self.repo, prefix)
    }
}

/// Clone `url` into `path`, or refresh an existing checkout there
///
/// For an existing checkout the remote is fetched and the working tree is
/// switched to `branch`, falling back to `main` then `master`.
pub fn clone_or_update(url: &RepoUrl, path: &Path, branch: Option<&str>) -> Result<()> {
    if path.join(".git").exists() {
        tracing::info!(path = %path.display(), "Repository exists, updating");
        return update_existing(path, branch);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Git(format!("Failed to create clone directory: {}", e)))?;
    }

    let mut cmd = Command::new("git");
    cmd.arg("clone");
    if let Some(branch) = branch {
        cmd.args(["--branch", branch]);
    }
    let output = cmd
        .arg(&url.clone_url)
        .arg(path)
        .output()
        .map_err(|e| Error::Git(format!("Failed to run git clone: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);

        if stderr.contains("Authentication failed") || stderr.contains("Permission denied") {
            return Err(Error::Git(format!(
                "Authentication failed for {}. Check your credentials or repository access.",
                url.clone_url
            )));
        }

        if stderr.contains("Could not resolve host") || stderr.contains("unable to access") {
            return Err(Error::Git(format!(
                "Network error cloning {}. Check your internet connection.",
                url.clone_url
            )));
        }

        if stderr.contains("not found") || stderr.contains("does not exist") {
            return Err(Error::Git(format!(
                "Repository or branch not found: {}",
                url.clone_url
            )));
        }

        return Err(Error::Git(format!("git clone failed: {}", stderr.trim())));
    }

    tracing::info!(url = %url.clone_url, path = %path.display(), "Cloned repository");
    Ok(())
}

fn update_existing(path: &Path, branch: Option<&str>) -> Result<()> {
    if let Err(e) = run_git(path, &["fetch", "--all", "--prune"]) {
        // stale but usable
        tracing::warn!(path = %path.display(), error = %e, "git fetch failed");
    }

    let repo = GitRepo::open(path)?;
    let local = repo.list_local_branches()?;
    let remote = repo.list_remote_branches()?;
    let known = |name: &str| {
        local.iter().any(|b| b == name) || remote.iter().any(|b| b == &format!("origin/{}", name))
    };

    let target = branch
        .into_iter()
        .chain(["main", "master"])
        .find(|b| known(*b))
        .ok_or_else(|| Error::Git(format!("No usable branch in {}", path.display())))?;

    run_git(path, &["checkout", target])?;
    if remote.iter().any(|b| b == &format!("origin/{}", target)) {
        run_git(path, &["pull", "--ff-only", "origin", target])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shorthand() {
        let url = RepoUrl::parse("owner/repo").unwrap();
        assert_eq!(url.owner, "owner");
        assert_eq!(url.repo, "repo");
        assert_eq!(url.host, "github.com");
        assert_eq!(url.clone_url, "https://github.com/owner/repo.git");
    }

    #[test]
    fn test_parse_https() {
        let url = RepoUrl::parse("https://github.com/owner/repo").unwrap();
        assert_eq!(url.owner, "owner");
        assert_eq!(url.repo, "repo");
        assert_eq!(url.clone_url, "https://github.com/owner/repo.git");
    }

    #[test]
    fn test_parse_https_with_git() {
        let url = RepoUrl::parse("https://github.com/owner/repo.git").unwrap();
        assert_eq!(url.repo, "repo");
        assert_eq!(url.clone_url, "https://github.com/owner/repo.git");
    }

    #[test]
    fn test_parse_git_ssh() {
        let url = RepoUrl::parse("git@github.com:owner/repo.git").unwrap();
        assert_eq!(url.owner, "owner");
        assert_eq!(url.repo, "repo");
        assert_eq!(url.host, "github.com");
    }

    #[test]
    fn test_clone_dir_name() {
        let url = RepoUrl::parse("owner/repo").unwrap();
        assert_eq!(url.clone_dir_name("1234-5678-9abc"), "repo-12345678");
        assert_eq!(url.clone_dir_name("../x"), "repo-x");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(RepoUrl::parse("invalid").is_err());
        assert!(RepoUrl::parse("").is_err());
        assert!(RepoUrl::parse("https://github.com/owner").is_err());
    }
}
