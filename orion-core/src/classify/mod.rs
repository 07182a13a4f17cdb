//! Task classification
//!
//! Maps a free-text instruction to a coarse label set: what kind of action is
//! being asked for, what sort of task it is, how wide and how hard it looks,
//! and which files it names. Classification is a pure function of the
//! instruction (and optionally a prior scan); it performs no I/O.

mod keywords;
mod mentions;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scan::RepositoryScan;

pub use keywords::PARALLEL_HINTS;
pub use mentions::extract_mentioned_files;

/// What the instruction asks the agent to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Modify,
    Create,
    Analyze,
}

/// Category of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    BugFix,
    Feature,
    Refactor,
    Enhancement,
    Maintenance,
    Documentation,
    General,
}

/// How many files the task is expected to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    SingleFile,
    MultiFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Modify => "modify",
            Action::Create => "create",
            Action::Analyze => "analyze",
        };
        write!(f, "{}", name)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::BugFix => "bug_fix",
            TaskType::Feature => "feature",
            TaskType::Refactor => "refactor",
            TaskType::Enhancement => "enhancement",
            TaskType::Maintenance => "maintenance",
            TaskType::Documentation => "documentation",
            TaskType::General => "general",
        };
        write!(f, "{}", name)
    }
}

/// Classification of one instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskClassification {
    pub original_prompt: String,
    pub primary_action: Action,
    pub task_type: TaskType,
    pub scope: Scope,
    pub complexity: Complexity,
    /// Files named in the instruction, in first-occurrence order
    pub mentioned_files: Vec<String>,
    /// Files the agent should start from
    pub target_files: Vec<String>,
    pub suggested_approach: String,
    /// Always within `[0, 1]`
    pub confidence: f64,
    /// Named files must be validated, or a modify task must locate its target
    pub requires_repository_scan: bool,
}

/// Classify an instruction
///
/// `scan` is optional context: it raises complexity for large repositories and
/// lets modify tasks without a named file pick likely targets.
pub fn classify(prompt: &str, scan: Option<&RepositoryScan>) -> TaskClassification {
    let lower = prompt.trim().to_lowercase();
    let mentioned_files = extract_mentioned_files(prompt);

    let primary_action = primary_action(&lower);
    let task_type = task_type(&lower);
    let scope = scope(&lower, &mentioned_files);
    let complexity = complexity(&lower, &mentioned_files, scan);
    let (target_files, suggested_approach) =
        suggestions(&lower, &mentioned_files, primary_action, scan);

    let requires_repository_scan = !mentioned_files.is_empty()
        || (primary_action == Action::Modify && mentioned_files.is_empty());

    let confidence = confidence(&lower, &mentioned_files);

    tracing::debug!(
        action = %primary_action,
        task_type = %task_type,
        confidence,
        "Task classified"
    );

    TaskClassification {
        original_prompt: prompt.to_string(),
        primary_action,
        task_type,
        scope,
        complexity,
        mentioned_files,
        target_files,
        suggested_approach,
        confidence,
        requires_repository_scan,
    }
}

fn primary_action(lower: &str) -> Action {
    if keywords::any(lower, keywords::ANALYZE) {
        return Action::Analyze;
    }

    let modify = keywords::hits(lower, keywords::MODIFICATION);
    let create = keywords::hits(lower, keywords::CREATION);

    match modify.cmp(&create) {
        std::cmp::Ordering::Greater => Action::Modify,
        std::cmp::Ordering::Less => Action::Create,
        std::cmp::Ordering::Equal if keywords::any(lower, keywords::MODIFY_CONTEXT) => {
            Action::Modify
        }
        std::cmp::Ordering::Equal => Action::Create,
    }
}

fn task_type(lower: &str) -> TaskType {
    let mut best = (TaskType::General, 0);
    for (task_type, table) in keywords::TASK_TYPES {
        let score = keywords::hits(lower, table);
        // strictly greater keeps the first-registered type on ties
        if score > best.1 {
            best = (*task_type, score);
        }
    }
    best.0
}

fn scope(lower: &str, mentioned: &[String]) -> Scope {
    match mentioned.len() {
        0 => {
            let single = keywords::hits(lower, keywords::SINGLE_FILE_SCOPE);
            let multi = keywords::hits(lower, keywords::MULTI_FILE_SCOPE);
            if multi > single {
                Scope::MultiFile
            } else {
                Scope::SingleFile
            }
        }
        1 => Scope::SingleFile,
        _ => Scope::MultiFile,
    }
}

fn complexity(lower: &str, mentioned: &[String], scan: Option<&RepositoryScan>) -> Complexity {
    let mut score = 3 * keywords::hits(lower, keywords::HIGH_COMPLEXITY)
        + 2 * keywords::hits(lower, keywords::MEDIUM_COMPLEXITY)
        + keywords::hits(lower, keywords::LOW_COMPLEXITY);

    score += match mentioned.len() {
        n if n > 3 => 3,
        n if n > 1 => 1,
        _ => 0,
    };

    if scan.is_some_and(|s| s.total_files() > 50) {
        score += 1;
    }

    match score {
        s if s >= 6 => Complexity::High,
        s if s >= 3 => Complexity::Medium,
        _ => Complexity::Low,
    }
}

fn suggestions(
    lower: &str,
    mentioned: &[String],
    action: Action,
    scan: Option<&RepositoryScan>,
) -> (Vec<String>, String) {
    match action {
        Action::Modify if !mentioned.is_empty() => (
            mentioned.to_vec(),
            format!("Modify the specified files: {}", mentioned.join(", ")),
        ),
        Action::Modify => {
            let mut approach = "Scan repository to identify files that need modification".to_string();
            let relevant = scan
                .map(|s| relevant_python_files(lower, s))
                .unwrap_or_default();
            if !relevant.is_empty() {
                approach.push_str(&format!(". Suggested files: {}", relevant.join(", ")));
            }
            (relevant, approach)
        }
        Action::Create => {
            let targets = if !mentioned.is_empty() {
                mentioned.to_vec()
            } else if lower.contains("script") {
                vec!["new_script.py".to_string()]
            } else if lower.contains("module") {
                vec!["new_module.py".to_string()]
            } else if lower.contains("class") {
                vec!["new_class.py".to_string()]
            } else {
                vec!["generated_code.py".to_string()]
            };
            (targets, "Create new files as specified".to_string())
        }
        Action::Analyze => (
            mentioned.to_vec(),
            "Analyze the repository or specified files".to_string(),
        ),
    }
}

/// Python files whose path contains one of the instruction's words (top 3)
fn relevant_python_files(lower: &str, scan: &RepositoryScan) -> Vec<String> {
    let words: Vec<&str> = lower.split_whitespace().filter(|w| w.len() > 2).collect();
    scan.python_files
        .iter()
        .filter(|path| {
            let path = path.to_lowercase();
            words.iter().any(|w| path.contains(w))
        })
        .take(3)
        .cloned()
        .collect()
}

fn confidence(lower: &str, mentioned: &[String]) -> f64 {
    let mut confidence = 0.5;

    if !mentioned.is_empty() {
        confidence += 0.3;
    }

    let keyword_hits = keywords::hits(lower, keywords::MODIFICATION)
        + keywords::hits(lower, keywords::CREATION);
    confidence += (0.1 * keyword_hits as f64).min(0.3);

    if keywords::TASK_TYPES
        .iter()
        .any(|(_, table)| keywords::any(lower, table))
    {
        confidence += 0.1;
    }

    confidence.clamp(0.0, 1.0)
}

/// Resolve mentioned files against a scan's inventory
///
/// Exact relative paths are kept; otherwise the first inventoried path that
/// ends with, or contains, the mention is used. Unresolved mentions are kept
/// as written.
pub fn validate_files(classification: &TaskClassification, scan: &RepositoryScan) -> Vec<String> {
    classification
        .mentioned_files
        .iter()
        .map(|mention| {
            if scan.file_inventory.contains_key(mention) {
                return mention.clone();
            }
            scan.file_inventory
                .keys()
                .find(|path| path.ends_with(mention.as_str()) || path.contains(mention.as_str()))
                .cloned()
                .unwrap_or_else(|| mention.clone())
        })
        .collect()
}

/// Suggest up to five files to work on for a classification
pub fn suggest_target_files(
    classification: &TaskClassification,
    scan: Option<&RepositoryScan>,
) -> Vec<String> {
    let mut suggestions: Vec<String> = classification.mentioned_files.clone();

    if let (Some(scan), Action::Modify) = (scan, classification.primary_action) {
        let lowered = |f: &&String| f.to_lowercase();
        match classification.task_type {
            TaskType::BugFix => suggestions.extend(
                scan.python_files
                    .iter()
                    .filter(|f| lowered(f).contains("test") || lowered(f).contains("main"))
                    .cloned(),
            ),
            TaskType::Feature => suggestions.extend(
                scan.modification_candidates
                    .iter()
                    .filter(|f| lowered(f).contains("main") || lowered(f).contains("app"))
                    .cloned(),
            ),
            TaskType::Documentation => suggestions.extend(
                scan.python_files
                    .iter()
                    .filter(|f| !lowered(f).starts_with("test"))
                    .cloned(),
            ),
            _ => {}
        }
    }

    let mut unique = Vec::new();
    for file in suggestions {
        if !unique.contains(&file) {
            unique.push(file);
        }
    }
    unique.truncate(5);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::FileInfo;

    fn scan_with(paths: &[&str]) -> RepositoryScan {
        let mut scan = RepositoryScan::default();
        for path in paths {
            let is_python = path.ends_with(".py");
            scan.file_inventory.insert(
                path.to_string(),
                FileInfo {
                    size_bytes: 100,
                    extension: if is_python { ".py".into() } else { String::new() },
                    is_text: true,
                    is_python,
                    last_modified: None,
                },
            );
            if is_python {
                scan.python_files.push(path.to_string());
                scan.modification_candidates.push(path.to_string());
            }
        }
        scan
    }

    #[test]
    fn test_bug_fix_with_named_file() {
        let c = classify("Fix the bug in app.py", None);
        assert_eq!(c.primary_action, Action::Modify);
        assert_eq!(c.task_type, TaskType::BugFix);
        assert_eq!(c.mentioned_files, vec!["app.py"]);
        assert!(c.requires_repository_scan);
        assert_eq!(c.scope, Scope::SingleFile);
    }

    #[test]
    fn test_empty_instruction() {
        let c = classify("", None);
        assert_eq!(c.primary_action, Action::Create);
        assert_eq!(c.task_type, TaskType::General);
        assert!(c.mentioned_files.is_empty());
        assert_eq!(c.confidence, 0.5);
        assert!(!c.requires_repository_scan);
        assert_eq!(c.complexity, Complexity::Low);
    }

    #[test]
    fn test_creation_wins_on_score() {
        let c = classify("Create a new greeting utility", None);
        assert_eq!(c.primary_action, Action::Create);
        assert_eq!(c.task_type, TaskType::Feature);
        assert!(!c.requires_repository_scan);
        assert_eq!(c.target_files, vec!["generated_code.py"]);
    }

    #[test]
    fn test_tie_breaks_on_context_words() {
        // "fix" vs "add": one hit each
        let c = classify("fix or add something to the existing flow", None);
        assert_eq!(c.primary_action, Action::Modify);

        let c = classify("fix or add something", None);
        assert_eq!(c.primary_action, Action::Create);
    }

    #[test]
    fn test_analyze_action() {
        let c = classify("Explain how this project works", None);
        assert_eq!(c.primary_action, Action::Analyze);
    }

    #[test]
    fn test_modify_without_file_requires_scan() {
        let c = classify("Refactor the logging", None);
        assert_eq!(c.primary_action, Action::Modify);
        assert_eq!(c.task_type, TaskType::Refactor);
        assert!(c.mentioned_files.is_empty());
        assert!(c.requires_repository_scan);
    }

    #[test]
    fn test_task_type_tie_goes_to_first_registered() {
        // one bug_fix hit ("error") and one documentation hit ("docs")
        let c = classify("error in docs", None);
        assert_eq!(c.task_type, TaskType::BugFix);
    }

    #[test]
    fn test_confidence_bounds() {
        for prompt in [
            "",
            "Fix the bug in app.py",
            "create add new build make generate implement develop write fix update change a.py b.py",
            "???",
        ] {
            let c = classify(prompt, None);
            assert!((0.0..=1.0).contains(&c.confidence), "{}: {}", prompt, c.confidence);
        }
        let c = classify(
            "create add new build make generate implement develop write fix update change a.py",
            None,
        );
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn test_scope_and_complexity() {
        let c = classify("Integrate the auth api into the database system", None);
        assert_eq!(c.scope, Scope::MultiFile);
        assert_eq!(c.complexity, Complexity::High);

        let c = classify("Update a.py, b.py", None);
        assert_eq!(c.scope, Scope::MultiFile);
        // update (2) + two files (1)
        assert_eq!(c.complexity, Complexity::Medium);
    }

    #[test]
    fn test_modify_suggests_files_from_scan() {
        let scan = scan_with(&["app/logging_setup.py", "main.py", "README"]);
        let c = classify("Improve and optimize logging output", Some(&scan));
        assert_eq!(c.primary_action, Action::Modify);
        assert_eq!(c.target_files, vec!["app/logging_setup.py"]);
        assert!(c.suggested_approach.contains("Suggested files"));
    }

    #[test]
    fn test_validate_files_resolves_paths() {
        let scan = scan_with(&["src/app.py", "README"]);
        let c = classify("Fix app.py and notes.txt", None);
        assert_eq!(validate_files(&c, &scan), vec!["src/app.py", "notes.txt"]);
    }

    #[test]
    fn test_suggest_target_files_for_bug_fix() {
        let scan = scan_with(&["main.py", "tests/test_main.py", "lib.py"]);
        let c = classify("Fix the crash", Some(&scan));
        assert_eq!(c.task_type, TaskType::BugFix);
        assert_eq!(
            suggest_target_files(&c, Some(&scan)),
            vec!["main.py", "tests/test_main.py"]
        );
    }
}
