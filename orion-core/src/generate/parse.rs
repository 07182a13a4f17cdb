//! Parsing of model output

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn default_confidence() -> f64 {
    0.9
}

/// A file to create, with its full content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    pub content: String,
}

/// A change to apply to an existing file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModification {
    pub target: String,
    /// Natural-language description of the edit
    pub changes: String,
}

/// Structured generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
    #[serde(default)]
    pub modifications: Vec<FileModification>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_true() -> bool {
    true
}

impl GenerationResponse {
    /// Parse a JSON-mode reply; fenced JSON is accepted
    pub fn parse(text: &str) -> Result<Self> {
        let body = super::similarity::strip_fences(text);
        let response: Self = serde_json::from_str(&body)?;

        if !response.success {
            return Err(Error::Generation(format!(
                "Model reported failure: {}",
                response.reasoning
            )));
        }
        if response.files.is_empty() && response.modifications.is_empty() {
            return Err(Error::Generation(
                "Model returned no files and no modifications".to_string(),
            ));
        }
        Ok(response)
    }

    /// Wrap files recovered from plain-text output
    pub fn from_files(files: Vec<GeneratedFile>) -> Self {
        Self {
            success: true,
            files,
            modifications: Vec::new(),
            reasoning: "Generated in plain-text mode".to_string(),
            dependencies: Vec::new(),
            next_steps: Vec::new(),
            confidence: 0.7,
        }
    }
}

/// Extract `FILE: <name>` sections from plain text
///
/// Each header is followed by a fenced block holding the content. A header
/// with no fence takes every line up to the next header instead.
pub fn parse_file_blocks(text: &str) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;
    let mut in_fence = false;
    let mut fenced_done = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if !in_fence {
            if let Some(name) = file_header(trimmed) {
                flush(&mut current, &mut files);
                current = Some((name, Vec::new()));
                fenced_done = false;
                continue;
            }
        }

        let Some((_, lines)) = current.as_mut() else {
            continue;
        };

        if trimmed.starts_with("```") {
            if in_fence {
                in_fence = false;
                fenced_done = true;
            } else if !fenced_done {
                lines.clear();
                in_fence = true;
            }
            continue;
        }

        if in_fence || !fenced_done {
            lines.push(line);
        }
    }
    flush(&mut current, &mut files);

    files
}

fn flush(current: &mut Option<(String, Vec<&str>)>, files: &mut Vec<GeneratedFile>) {
    if let Some((name, lines)) = current.take() {
        let content = lines.join("\n");
        if !content.trim().is_empty() {
            files.push(GeneratedFile {
                name,
                content: format!("{}\n", content.trim_end()),
            });
        }
    }
}

fn file_header(line: &str) -> Option<String> {
    let line = line.trim_matches('*').trim();
    let rest = line
        .strip_prefix("FILE:")
        .or_else(|| line.strip_prefix("File:"))?;
    let name = rest.trim().trim_matches('`').trim();
    (!name.is_empty()).then(|| name.to_string())
}
