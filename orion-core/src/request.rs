//! Chat-message requests
//!
//! A chat message names a run with labeled lines:
//!
//! ```text
//! URL: https://github.com/owner/repo
//! BRANCH: develop
//! TASK: Add a fibonacci helper
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Longest reply a chat message may carry
pub const MAX_MESSAGE_LEN: usize = 1900;

/// Reply sent when a message does not parse
pub const FORMAT_HELP: &str = "Invalid format. Please use:\n\
URL: <github_repo_url>\n\
BRANCH: <branch> (optional, defaults to 'main')\n\
TASK: <task>\n\
\n\
Example:\n\
URL: https://github.com/username/repo\n\
TASK: Add a new feature to calculate fibonacci numbers";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*URL:[ \t]*(.*)$").unwrap());
static BRANCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*BRANCH:[ \t]*(.*)$").unwrap());
static TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*TASK:[ \t]*(.*)$").unwrap());

/// A run requested over chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub repo_url: String,
    pub branch: String,
    pub task: String,
}

fn field(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

impl ChatRequest {
    /// Parse a message; the error carries [`FORMAT_HELP`]
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        match (field(&URL_RE, text), field(&TASK_RE, text)) {
            (Some(repo_url), Some(task)) => Ok(Self {
                repo_url,
                branch: field(&BRANCH_RE, text).unwrap_or_else(|| "main".to_string()),
                task,
            }),
            _ => Err(Error::Request(FORMAT_HELP.to_string())),
        }
    }

    /// Explain mode is selected by the bare task `explain`
    pub fn is_explain(&self) -> bool {
        is_explain(&self.task)
    }
}

/// Whether an instruction selects read-only explain mode
pub fn is_explain(prompt: &str) -> bool {
    prompt.trim().eq_ignore_ascii_case("explain")
}

/// Split `text` into pieces of at most `max_len` characters
pub fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() || max_len == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_len)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
