//! Local repository operations

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{BranchType, Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};

use crate::scan::IGNORED_NAMES;
use crate::{Error, Result};

/// Prefix applied to every branch the agent creates
pub const BRANCH_PREFIX: &str = "orion/";

/// Working-tree summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStatus {
    /// Current branch, `None` when detached or unborn
    pub branch: Option<String>,
    pub modified: usize,
    pub added: usize,
    pub untracked: usize,
    pub has_changes: bool,
}

/// A git repository wrapper providing orion-specific operations
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the git repository at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Config(format!("Not a git repository: {}", path.display()))
            } else {
                Error::Git(e.message().to_string())
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the current branch name
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(format!("Failed to get HEAD: {}", e))),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// List all local branches
    pub fn list_local_branches(&self) -> Result<Vec<String>> {
        self.list_branches(BranchType::Local)
    }

    /// List all remote tracking branches (`origin/foo`)
    pub fn list_remote_branches(&self) -> Result<Vec<String>> {
        self.list_branches(BranchType::Remote)
    }

    fn list_branches(&self, kind: BranchType) -> Result<Vec<String>> {
        let mut branches = Vec::new();

        for branch in self
            .repo
            .branches(Some(kind))
            .map_err(|e| Error::Git(format!("Failed to list branches: {}", e)))?
        {
            let (branch, _) =
                branch.map_err(|e| Error::Git(format!("Failed to read branch: {}", e)))?;
            if let Some(name) = branch.name().ok().flatten() {
                branches.push(name.to_string());
            }
        }

        Ok(branches)
    }

    /// Every branch name known locally or on any remote, remote prefix removed
    pub fn existing_branch_names(&self) -> Result<Vec<String>> {
        let mut names = self.list_local_branches()?;
        for remote in self.list_remote_branches()? {
            let name = remote
                .split_once('/')
                .map(|(_, rest)| rest.to_string())
                .unwrap_or(remote);
            if name != "HEAD" && !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Create a local branch at HEAD whose name collides with no existing
    /// local or remote branch
    ///
    /// Returns `orion/<base>` when free, otherwise `orion/<base>-<n>` with the
    /// smallest free `n >= 1`.
    pub fn create_unique_branch(&self, base: &str) -> Result<String> {
        let existing = self.existing_branch_names()?;
        let name = unique_branch_name(base, &existing);

        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| Error::Git(format!("Cannot branch without a commit: {}", e)))?;
        self.repo.branch(&name, &head, false)?;

        tracing::info!(branch = %name, "Created branch");
        Ok(name)
    }

    /// Switch the working tree to a local branch
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let refname = format!("refs/heads/{}", name);
        let object = self
            .repo
            .revparse_single(&refname)
            .map_err(|e| Error::Git(format!("Branch '{}' not found: {}", name, e)))?;
        self.repo.checkout_tree(&object, None)?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    /// Summarize the working tree
    pub fn status(&self) -> Result<RepoStatus> {
        let mut options = StatusOptions::new();
        options.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = self.repo.statuses(Some(&mut options))?;

        let mut status = RepoStatus {
            branch: self.current_branch()?,
            ..Default::default()
        };

        for entry in statuses.iter() {
            let s = entry.status();
            if s.contains(Status::WT_NEW) {
                status.untracked += 1;
            } else if s.contains(Status::INDEX_NEW) {
                status.added += 1;
            } else if s.intersects(
                Status::WT_MODIFIED
                    | Status::INDEX_MODIFIED
                    | Status::WT_DELETED
                    | Status::INDEX_DELETED
                    | Status::WT_RENAMED
                    | Status::INDEX_RENAMED,
            ) {
                status.modified += 1;
            }
        }

        status.has_changes = status.modified + status.added + status.untracked > 0;
        Ok(status)
    }

    /// Stage everything except virtualenvs, caches and build output, then commit
    ///
    /// Uses the git CLI so the user's identity and hooks apply. Returns
    /// `false` when there was nothing to commit.
    pub fn commit_all(&self, message: &str) -> Result<bool> {
        self.exclude_ignored_names()?;
        if !self.status()?.has_changes {
            tracing::warn!(path = %self.root.display(), "Nothing to commit");
            return Ok(false);
        }

        run_git(&self.root, &["add", "-A"])?;
        run_git(&self.root, &["commit", "-m", message])?;
        Ok(true)
    }

    /// Add every scanner-ignored name to `.git/info/exclude`
    fn exclude_ignored_names(&self) -> Result<()> {
        let path = self.repo.path().join("info").join("exclude");
        let current = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let missing: Vec<&str> = IGNORED_NAMES
            .iter()
            .copied()
            .filter(|name| *name != ".git")
            .filter(|name| !current.lines().any(|line| line.trim() == *name))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let mut text = current;
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        for name in missing {
            text.push_str(name);
            text.push('\n');
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, text)?;
        Ok(())
    }

    /// Push a branch to origin and set upstream
    pub fn push_branch(&self, name: &str) -> Result<()> {
        run_git(&self.root, &["push", "--set-upstream", "origin", name])
    }
}

/// Pick `orion/<base>` or the first free numbered variant
pub fn unique_branch_name(base: &str, existing: &[String]) -> String {
    let base = base.strip_prefix(BRANCH_PREFIX).unwrap_or(base);
    let candidate = format!("{}{}", BRANCH_PREFIX, base);
    if !existing.contains(&candidate) {
        return candidate;
    }

    let mut n = 1;
    loop {
        let candidate = format!("{}{}-{}", BRANCH_PREFIX, base, n);
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Build the commit message for an instruction
pub fn commit_message(prompt: &str) -> String {
    const PREFIX: &str = ":robot: [orion] ";
    if prompt.starts_with(PREFIX) {
        prompt.to_string()
    } else {
        format!("{}{}", PREFIX, prompt)
    }
}

pub(crate) fn run_git(dir: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::Git(format!("Failed to run git {}: {}", args.join(" "), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(())
}
