//! Keyword tables used by the task classifier
//!
//! All matching is substring containment on the lowercased instruction.

use super::TaskType;

pub const MODIFICATION: &[&str] = &[
    "modify", "update", "change", "fix", "edit", "alter", "revise", "improve", "enhance",
    "refactor", "optimize", "debug", "patch", "correct", "adjust", "tweak", "replace", "remove",
    "delete",
];

pub const CREATION: &[&str] = &[
    "create", "add", "new", "build", "make", "generate", "implement", "develop", "write",
    "design", "construct", "establish", "setup", "initialize", "start", "begin",
];

/// Words that tip an equal modify/create score towards modify
pub const MODIFY_CONTEXT: &[&str] = &["existing", "current", "in the"];

pub const ANALYZE: &[&str] = &["explain", "analyze"];

/// Task-type tables in registration order; earlier entries win ties
pub const TASK_TYPES: &[(TaskType, &[&str])] = &[
    (
        TaskType::BugFix,
        &["fix", "bug", "error", "issue", "problem", "broken", "crash"],
    ),
    (
        TaskType::Feature,
        &["feature", "functionality", "capability", "add", "new"],
    ),
    (
        TaskType::Refactor,
        &["refactor", "restructure", "reorganize", "clean", "optimize"],
    ),
    (
        TaskType::Enhancement,
        &["improve", "enhance", "better", "upgrade", "extend"],
    ),
    (
        TaskType::Maintenance,
        &["update", "maintain", "sync", "merge", "integrate"],
    ),
    (
        TaskType::Documentation,
        &["document", "comment", "docstring", "readme", "docs"],
    ),
];

pub const SINGLE_FILE_SCOPE: &[&str] = &["function", "method", "class", "variable", "line"];
pub const MULTI_FILE_SCOPE: &[&str] = &["module", "package", "system", "application", "project"];

pub const HIGH_COMPLEXITY: &[&str] = &[
    "complex",
    "multiple",
    "integrate",
    "refactor",
    "architecture",
    "system",
    "database",
    "api",
    "authentication",
    "security",
];
pub const MEDIUM_COMPLEXITY: &[&str] = &["add", "implement", "create", "modify", "update", "enhance"];
pub const LOW_COMPLEXITY: &[&str] = &["fix", "change", "replace", "remove", "simple", "basic"];

/// Instruction words that mark a run as a candidate for parallel work
pub const PARALLEL_HINTS: &[&str] = &["complex", "multiple", "parallel", "concurrent"];

/// Number of keywords from `table` contained in `text`
pub fn hits(text: &str, table: &[&str]) -> usize {
    table.iter().filter(|k| text.contains(*k)).count()
}

/// Whether any keyword from `table` is contained in `text`
pub fn any(text: &str, table: &[&str]) -> bool {
    table.iter().any(|k| text.contains(k))
}
