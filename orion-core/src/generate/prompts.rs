//! Prompt templates
//!
//! System prompts are embedded Markdown. User prompts use `{{VARIABLE}}`
//! placeholders rendered from a [`PromptContext`].

use std::collections::HashMap;

const GENERATE_SYSTEM: &str = include_str!("prompts/generate.md");
const FALLBACK_SYSTEM: &str = include_str!("prompts/fallback.md");
const MODIFY_SYSTEM: &str = include_str!("prompts/modify.md");
const EXPLAIN_SYSTEM: &str = include_str!("prompts/explain.md");

const TASK_USER: &str = "Repository: {{REPO}}\nTask: {{TASK}}\n\nContext:\n{{CONTEXT}}\n";
const MODIFY_USER: &str =
    "Requested change: {{CHANGES}}\n\nOriginal content of `{{FILE}}`:\n```\n{{CONTENT}}\n```\n";
const EXPLAIN_USER: &str = "Repository: {{REPO}}\n\n{{SUMMARY}}\n";

/// Which exchange a prompt is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Structured JSON generation
    Generate,
    /// Plain-text `FILE:` generation
    Fallback,
    /// Whole-file rewrite for one modification
    Modify,
    /// Repository explanation
    Explain,
}

impl PromptKind {
    fn templates(self) -> (&'static str, &'static str) {
        match self {
            Self::Generate => (GENERATE_SYSTEM, TASK_USER),
            Self::Fallback => (FALLBACK_SYSTEM, TASK_USER),
            Self::Modify => (MODIFY_SYSTEM, MODIFY_USER),
            Self::Explain => (EXPLAIN_SYSTEM, EXPLAIN_USER),
        }
    }
}

/// A rendered system + user pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Variable substitutions for a template
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    variables: HashMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable value (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn with_task(self, task: impl Into<String>) -> Self {
        self.with("TASK", task)
    }

    pub fn with_repo(self, repo: impl Into<String>) -> Self {
        self.with("REPO", repo)
    }

    /// Context lines, one per bullet
    pub fn with_context(self, lines: &[String]) -> Self {
        let text = if lines.is_empty() {
            "No additional context provided".to_string()
        } else {
            lines
                .iter()
                .map(|l| format!("- {}", l))
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.with("CONTEXT", text)
    }
}

/// Render the prompt pair for `kind`
pub fn render(kind: PromptKind, context: &PromptContext) -> Prompt {
    let (system, user) = kind.templates();
    Prompt {
        system: system.trim().to_string(),
        user: render_template(user, context),
    }
}

/// Substitute variables; unset uppercase placeholders become `(not specified)`
fn render_template(template: &str, context: &PromptContext) -> String {
    let mut result = template.to_string();

    for (key, value) in &context.variables {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }

    let mut search_from = 0;
    while let Some(rel) = result[search_from..].find("{{") {
        let start = search_from + rel;
        let Some(len) = result[start..].find("}}") else {
            break;
        };
        let inside = &result[start + 2..start + len];
        if !inside.is_empty() && inside.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            result.replace_range(start..start + len + 2, "(not specified)");
            search_from = start + "(not specified)".len();
        } else {
            search_from = start + 2;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_task_prompt() {
        let context = PromptContext::new()
            .with_repo("/tmp/repo")
            .with_task("Add a greeting")
            .with_context(&["Task type: feature".to_string()]);
        let prompt = render(PromptKind::Generate, &context);

        assert!(prompt.system.contains("\"modifications\""));
        assert!(prompt.user.contains("Repository: /tmp/repo"));
        assert!(prompt.user.contains("Task: Add a greeting"));
        assert!(prompt.user.contains("- Task type: feature"));
    }

    #[test]
    fn test_unset_placeholders() {
        let prompt = render(PromptKind::Fallback, &PromptContext::new());
        assert!(prompt.user.contains("Task: (not specified)"));
        assert!(!prompt.user.contains("{{"));
        assert!(prompt.system.contains("FILE:"));
    }

    #[test]
    fn test_values_containing_braces_survive() {
        let context = PromptContext::new()
            .with("CHANGES", "use {{x}}")
            .with("FILE", "a.py")
            .with("CONTENT", "d = {}\n");
        let prompt = render(PromptKind::Modify, &context);
        assert!(prompt.user.contains("use {{x}}"));
        assert!(prompt.user.contains("d = {}"));
    }

    #[test]
    fn test_empty_context() {
        let context = PromptContext::new().with_context(&[]);
        let prompt = render(PromptKind::Generate, &context);
        assert!(prompt.user.contains("No additional context provided"));
    }
}
