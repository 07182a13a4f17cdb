//! Read-only explain mode
//!
//! Summarizes the Python files of a repository and asks the model to explain
//! the codebase. Nothing is written to the repository.

use std::path::{Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;

use crate::generate::{render, ChatModel, PromptContext, PromptKind};
use crate::git::RepoUrl;
use crate::scan::{CodeAnalysis, IGNORED_NAMES};
use crate::workflow::VersionControl;
use crate::Result;

const NO_FILES: &str = "No Python files found in repository.";

/// One `path: first docstring line` entry per Python file, sorted by path
pub fn summarize_repository(root: &Path) -> String {
    let mut lines: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e.file_name()
                    .to_str()
                    .is_some_and(|name| !IGNORED_NAMES.contains(&name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            let doc = std::fs::read_to_string(e.path())
                .ok()
                .and_then(|content| {
                    CodeAnalysis::from_source(&content)
                        .summary_line()
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "(no docstring)".to_string());
            format!("{}: {}", rel.to_string_lossy().replace('\\', "/"), doc)
        })
        .collect();

    if lines.is_empty() {
        return NO_FILES.to_string();
    }
    lines.sort();
    lines.join("\n")
}

/// Explain a local checkout
///
/// Model failures are not errors: the reply then carries the failure text
/// followed by the static summary.
pub async fn explain(root: &Path, model: &dyn ChatModel) -> String {
    let summary = summarize_repository(root);
    let repo = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let prompt = render(
        PromptKind::Explain,
        &PromptContext::new()
            .with_repo(repo)
            .with("SUMMARY", summary.as_str()),
    );

    match model.complete(&prompt.system, &prompt.user, false).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => format!("The model returned an empty explanation.\n\n{}", summary),
        Err(e) => {
            tracing::warn!(error = %e, "Explanation request failed");
            format!("Failed to generate explanation: {}\n\n{}", e, summary)
        }
    }
}

/// Clone (or refresh) `repo_url` under `workdir` and explain it
///
/// The checkout lives in the session's own clone directory, as for a
/// workflow run. A session id is generated when none is given.
pub async fn explain_repository(
    vcs: &dyn VersionControl,
    model: &dyn ChatModel,
    repo_url: &str,
    workdir: &Path,
    branch: Option<&str>,
    session_id: Option<&str>,
) -> Result<String> {
    let url = RepoUrl::parse(repo_url)?;
    let session_id = session_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let path: PathBuf = workdir.join(url.clone_dir_name(&session_id));

    tracing::info!(
        repo = %url.repo,
        session_id = %session_id,
        path = %path.display(),
        "Explaining repository"
    );
    vcs.clone_repo(repo_url, &path, branch).await?;
    Ok(explain(&path, model).await)
}
