//! Code generation through a chat model
//!
//! The generator asks for a structured JSON reply first. When the request or
//! its parsing fails it retries once in plain-text mode and recovers files
//! from `FILE:` headers. New files are written under the repository root;
//! each requested modification is a second round-trip that rewrites the
//! target file and is rejected when it changes too much of it.

mod client;
mod parse;
mod prompts;
mod similarity;

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::classify::TaskClassification;
use crate::scan::IGNORED_NAMES;
use crate::workflow::CodeGenerator;
use crate::{Error, Result};

pub use client::{ChatModel, LlmClient};
pub use parse::{parse_file_blocks, FileModification, GeneratedFile, GenerationResponse};
pub use prompts::{render, Prompt, PromptContext, PromptKind};
pub use similarity::{similarity_ratio, strip_fences, MIN_SIMILARITY};

/// Extensions listed as existing code in the prompt context
const CODE_EXTENSIONS: &[&str] = &["py", "js", "ts", "java", "go", "rs"];

/// Most existing code files listed in the prompt context
const MAX_CONTEXT_FILES: usize = 10;

/// What the generator knows about the task beyond the instruction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationContext {
    pub classification: Option<TaskClassification>,
    /// Compact repository description from a scan
    pub scan_lines: Vec<String>,
}

/// Files written by one generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    /// Paths relative to the repository root
    pub created_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub reasoning: String,
    pub dependencies: Vec<String>,
    pub next_steps: Vec<String>,
    pub confidence: f64,
    /// The structured reply was unusable and plain-text mode was used
    pub used_fallback: bool,
}

/// Code generator backed by a [`ChatModel`]
#[derive(Clone)]
pub struct LlmGenerator {
    model: Arc<dyn ChatModel>,
}

impl std::fmt::Debug for LlmGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGenerator")
            .field("model", &self.model.model())
            .finish()
    }
}

impl LlmGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Ask the model for a structured reply, falling back to plain text
    pub async fn request(
        &self,
        prompt: &str,
        repo: &Path,
        context: &GenerationContext,
    ) -> Result<(GenerationResponse, bool)> {
        let vars = PromptContext::new()
            .with_repo(repo.display().to_string())
            .with_task(prompt)
            .with_context(&context_lines(context, repo));

        let structured = render(PromptKind::Generate, &vars);
        tracing::info!(model = %self.model.model(), "Generating code");

        let first = match self
            .model
            .complete(&structured.system, &structured.user, true)
            .await
        {
            Ok(text) => GenerationResponse::parse(&text),
            Err(e) => Err(e),
        };

        match first {
            Ok(response) => Ok((response, false)),
            Err(e) => {
                tracing::warn!(error = %e, "Structured generation failed, using plain-text mode");
                let fallback = render(PromptKind::Fallback, &vars);
                let text = self
                    .model
                    .complete(&fallback.system, &fallback.user, false)
                    .await?;
                let files = parse_file_blocks(&text);
                if files.is_empty() {
                    return Err(Error::Generation(
                        "Model output contained no FILE: sections".to_string(),
                    ));
                }
                Ok((GenerationResponse::from_files(files), true))
            }
        }
    }

    /// Rewrite one existing file as described by `changes`
    ///
    /// Returns the new content without writing it. Fails when the rewrite
    /// keeps less than [`MIN_SIMILARITY`] of the original.
    pub async fn modify_file(&self, repo: &Path, target: &str, changes: &str) -> Result<String> {
        let path = resolve_in_repo(repo, target)?;
        let original = std::fs::read_to_string(&path).map_err(|e| {
            Error::Generation(format!("Cannot read {} for modification: {}", target, e))
        })?;

        let vars = PromptContext::new()
            .with("CHANGES", changes)
            .with("FILE", target)
            .with("CONTENT", original.as_str());
        let prompt = render(PromptKind::Modify, &vars);
        let reply = self.model.complete(&prompt.system, &prompt.user, false).await?;
        let mut modified = strip_fences(&reply);
        if original.ends_with('\n') && !modified.ends_with('\n') {
            modified.push('\n');
        }

        let ratio = similarity_ratio(&original, &modified);
        if ratio < MIN_SIMILARITY {
            tracing::warn!(file = %target, similarity = ratio, "Modification rejected");
            return Err(Error::Generation(format!(
                "Modification of {} rejected: similarity {:.2} is below {:.2}",
                target, ratio, MIN_SIMILARITY
            )));
        }

        tracing::info!(file = %target, similarity = ratio, "Modification accepted");
        Ok(modified)
    }

    /// Write a generation's files and modifications into `repo`
    pub async fn apply(
        &self,
        repo: &Path,
        response: &GenerationResponse,
    ) -> Result<GenerationOutcome> {
        let mut outcome = GenerationOutcome {
            reasoning: response.reasoning.clone(),
            dependencies: response.dependencies.clone(),
            next_steps: response.next_steps.clone(),
            confidence: response.confidence,
            ..Default::default()
        };

        // validate everything before the first write
        let mut writes = Vec::new();
        for file in &response.files {
            let path = resolve_in_repo(repo, &file.name)?;
            writes.push((path, file.content.clone(), normalize(&file.name), false));
        }
        for modification in &response.modifications {
            let path = resolve_in_repo(repo, &modification.target)?;
            let content = self
                .modify_file(repo, &modification.target, &modification.changes)
                .await?;
            writes.push((path, content, normalize(&modification.target), true));
        }

        for (path, content, name, is_modification) in writes {
            let existed = path.exists();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
            tracing::info!(file = %name, existed, "Wrote file");

            let list = if existed || is_modification {
                &mut outcome.modified_files
            } else {
                &mut outcome.created_files
            };
            push_unique(list, name);
        }

        Ok(outcome)
    }
}

#[async_trait]
impl CodeGenerator for LlmGenerator {
    async fn generate(
        &self,
        prompt: &str,
        repo: &Path,
        context: &GenerationContext,
    ) -> Result<GenerationOutcome> {
        let (response, used_fallback) = self.request(prompt, repo, context).await?;
        let mut outcome = self.apply(repo, &response).await?;
        outcome.used_fallback = used_fallback;
        Ok(outcome)
    }
}

/// Join `relative` onto `repo`, refusing anything that could escape it
pub fn resolve_in_repo(repo: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative.trim());
    let escapes = rel.as_os_str().is_empty()
        || rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::Generation(format!(
            "Refusing path outside the repository: {}",
            relative
        )));
    }
    Ok(repo.join(rel))
}

fn normalize(relative: &str) -> String {
    relative.trim().trim_start_matches("./").replace('\\', "/")
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Context bullets: classification, scan summary, existing code files
fn context_lines(context: &GenerationContext, repo: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(c) = &context.classification {
        lines.push(format!("Action: {}", c.primary_action));
        lines.push(format!("Task type: {}", c.task_type));
        lines.push(format!("Approach: {}", c.suggested_approach));
        if !c.target_files.is_empty() {
            lines.push(format!("Target files: {}", c.target_files.join(", ")));
        }
    }

    lines.extend(context.scan_lines.iter().cloned());

    let existing = existing_code_files(repo);
    if !existing.is_empty() {
        lines.push(format!("Existing code files: {}", existing.join(", ")));
    }

    lines
}

fn existing_code_files(repo: &Path) -> Vec<String> {
    WalkDir::new(repo)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || e
                    .file_name()
                    .to_str()
                    .is_some_and(|name| !IGNORED_NAMES.contains(&name))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| CODE_EXTENSIONS.contains(&x))
        })
        .filter_map(|e| {
            e.path()
                .strip_prefix(repo)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .take(MAX_CONTEXT_FILES)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replays canned replies and records whether JSON mode was requested
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        pub(crate) json_flags: Mutex<Vec<bool>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                json_flags: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _system: &str, _user: &str, json: bool) -> Result<String> {
            self.json_flags.lock().unwrap().push(json);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Generation("no scripted reply".to_string())))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    fn generator(replies: Vec<Result<String>>) -> (LlmGenerator, Arc<ScriptedModel>) {
        let model = Arc::new(ScriptedModel::new(replies));
        (LlmGenerator::new(model.clone()), model)
    }

    #[tokio::test]
    async fn test_structured_generation_writes_files() {
        let dir = TempDir::new().unwrap();
        let reply = r#"{"success": true, "files": [{"name": "pkg/greet.py", "content": "print('hi')\n"}], "reasoning": "small"}"#;
        let (generator, model) = generator(vec![Ok(reply.to_string())]);

        let outcome = generator
            .generate("Create a greeting", dir.path(), &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.created_files, vec!["pkg/greet.py"]);
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.confidence, 0.9);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("pkg/greet.py")).unwrap(),
            "print('hi')\n"
        );
        assert_eq!(*model.json_flags.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back_to_plain_text() {
        let dir = TempDir::new().unwrap();
        let (generator, model) = generator(vec![
            Ok("this is not json".to_string()),
            Ok("FILE: util.py\n```python\nx = 1\n```\n".to_string()),
        ]);

        let outcome = generator
            .generate("Create util", dir.path(), &GenerationContext::default())
            .await
            .unwrap();

        assert!(outcome.used_fallback);
        assert_eq!(outcome.created_files, vec!["util.py"]);
        assert_eq!(*model.json_flags.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test]
    async fn test_fallback_without_files_fails() {
        let dir = TempDir::new().unwrap();
        let (generator, _) = generator(vec![
            Err(Error::Generation("boom".to_string())),
            Ok("I cannot help with that".to_string()),
        ]);

        let result = generator
            .generate("Create util", dir.path(), &GenerationContext::default())
            .await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }

    #[tokio::test]
    async fn test_modification_applied_when_similar() {
        let dir = TempDir::new().unwrap();
        let original = "import os\n\ndef main():\n    print('a')\n\nmain()\n";
        std::fs::write(dir.path().join("app.py"), original).unwrap();

        let reply = r#"{"files": [], "modifications": [{"target": "app.py", "changes": "print b"}]}"#;
        let edited = "```python\nimport os\n\ndef main():\n    print('b')\n\nmain()\n```";
        let (generator, _) = generator(vec![Ok(reply.to_string()), Ok(edited.to_string())]);

        let outcome = generator
            .generate("Fix app.py", dir.path(), &GenerationContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.modified_files, vec!["app.py"]);
        assert!(outcome.created_files.is_empty());
        let written = std::fs::read_to_string(dir.path().join("app.py")).unwrap();
        assert!(written.contains("print('b')"));
        assert!(written.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_drastic_modification_rejected() {
        let dir = TempDir::new().unwrap();
        let original = "a = 1\nb = 2\nc = 3\nd = 4\n";
        std::fs::write(dir.path().join("app.py"), original).unwrap();

        let reply = r#"{"modifications": [{"target": "app.py", "changes": "rewrite"}]}"#;
        let (generator, _) = generator(vec![
            Ok(reply.to_string()),
            Ok("totally\ndifferent\ncontent\nhere\n".to_string()),
        ]);

        let result = generator
            .generate("Rewrite app.py", dir.path(), &GenerationContext::default())
            .await;

        assert!(matches!(result, Err(Error::Generation(_))));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
            original
        );
    }

    #[tokio::test]
    async fn test_rejected_modification_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let original = "a = 1\nb = 2\nc = 3\nd = 4\n";
        std::fs::write(dir.path().join("app.py"), original).unwrap();

        let reply = r#"{"files": [{"name": "helper.py", "content": "def h():\n    pass\n"}], "modifications": [{"target": "app.py", "changes": "rewrite"}]}"#;
        let retry = r#"{"files": [{"name": "helper.py", "content": "def h():\n    pass\n"}]}"#;
        let (generator, _) = generator(vec![
            Ok(reply.to_string()),
            Ok("totally\ndifferent\ncontent\nhere\n".to_string()),
            Ok(retry.to_string()),
        ]);

        let first = generator
            .generate("Add helper", dir.path(), &GenerationContext::default())
            .await;
        assert!(matches!(first, Err(Error::Generation(_))));
        assert!(!dir.path().join("helper.py").exists());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("app.py")).unwrap(),
            original
        );

        let second = generator
            .generate("Add helper", dir.path(), &GenerationContext::default())
            .await
            .unwrap();
        assert_eq!(second.created_files, vec!["helper.py"]);
        assert!(second.modified_files.is_empty());
    }

    #[tokio::test]
    async fn test_escaping_path_rejected() {
        let dir = TempDir::new().unwrap();
        let reply = r#"{"files": [{"name": "../evil.py", "content": "x"}]}"#;
        let (generator, _) = generator(vec![Ok(reply.to_string())]);

        let result = generator
            .generate("Create", dir.path(), &GenerationContext::default())
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_in_repo() {
        let root = Path::new("/repo");
        assert_eq!(resolve_in_repo(root, "a/b.py").unwrap(), root.join("a/b.py"));
        assert!(resolve_in_repo(root, "/etc/passwd").is_err());
        assert!(resolve_in_repo(root, "a/../../b").is_err());
        assert!(resolve_in_repo(root, "").is_err());
    }

    #[test]
    fn test_context_lists_existing_code_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("main.py"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join(".venv")).unwrap();
        std::fs::write(dir.path().join(".venv/site.py"), "").unwrap();

        let lines = context_lines(&GenerationContext::default(), dir.path());
        assert_eq!(lines, vec!["Existing code files: main.py"]);
    }
}
