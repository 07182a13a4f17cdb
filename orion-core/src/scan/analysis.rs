//! Line-oriented structure extraction for Python sources

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:import\s+\S|from\s+\S+\s+import\s+\S)").unwrap());
static CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+(\w+)(?:\(([^)]*)\))?:").unwrap());
static FUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^def\s+(\w+)\s*\([^)]*\):").unwrap());
static CONSTANT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z_][A-Z0-9_]*)\s*=").unwrap());

/// A class or function definition found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    /// Defined name
    pub name: String,
    /// 1-based line number
    pub line: usize,
    /// The definition line as written (trimmed)
    pub signature: String,
    /// Base classes for class definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
}

/// Structure extracted from one Python file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub imports: Vec<String>,
    pub classes: Vec<Definition>,
    pub functions: Vec<Definition>,
    pub constants: Vec<String>,
    pub docstring: Option<String>,
    pub line_count: usize,
    pub has_main_guard: bool,
}

impl CodeAnalysis {
    /// Analyze Python source text
    ///
    /// Matching is done per trimmed line, so nested definitions are reported
    /// alongside top-level ones.
    pub fn from_source(content: &str) -> Self {
        let mut analysis = CodeAnalysis {
            docstring: module_docstring(content),
            line_count: content.split('\n').count(),
            has_main_guard: content.contains("if __name__ == \"__main__\"")
                || content.contains("if __name__ == '__main__'"),
            ..Default::default()
        };

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            let line_no = idx + 1;

            if IMPORT_RE.is_match(line) {
                analysis.imports.push(line.to_string());
            } else if let Some(caps) = CLASS_RE.captures(line) {
                let bases = caps
                    .get(2)
                    .map(|m| {
                        m.as_str()
                            .split(',')
                            .map(str::trim)
                            .filter(|b| !b.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                analysis.classes.push(Definition {
                    name: caps[1].to_string(),
                    line: line_no,
                    signature: line.to_string(),
                    bases,
                });
            } else if let Some(caps) = FUNCTION_RE.captures(line) {
                analysis.functions.push(Definition {
                    name: caps[1].to_string(),
                    line: line_no,
                    signature: line.to_string(),
                    bases: Vec::new(),
                });
            } else if let Some(caps) = CONSTANT_RE.captures(line) {
                analysis.constants.push(caps[1].to_string());
            }
        }

        analysis
    }

    /// First line of the module docstring, if any
    pub fn summary_line(&self) -> Option<&str> {
        self.docstring
            .as_deref()
            .and_then(|d| d.lines().map(str::trim).find(|l| !l.is_empty()))
    }
}

/// Docstring opening the module (leading whitespace allowed)
fn module_docstring(content: &str) -> Option<String> {
    let body = content.trim_start();
    for quote in ["\"\"\"", "'''"] {
        if let Some(rest) = body.strip_prefix(quote) {
            return rest.find(quote).map(|end| rest[..end].trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#""""Greeting helpers.

Longer description.
"""
import os
from typing import List

MAX_NAMES = 10
default_name = "world"


class Greeter(Base, Mixin):
    def greet(self, name):
        return f"hi {name}"


def main():
    print(Greeter().greet(default_name))


if __name__ == "__main__":
    main()
"#;

    #[test]
    fn test_extracts_structure() {
        let analysis = CodeAnalysis::from_source(SAMPLE);

        assert_eq!(analysis.imports, vec!["import os", "from typing import List"]);
        assert_eq!(analysis.constants, vec!["MAX_NAMES"]);
        assert_eq!(analysis.classes.len(), 1);
        assert_eq!(analysis.classes[0].name, "Greeter");
        assert_eq!(analysis.classes[0].line, 12);
        assert_eq!(analysis.classes[0].bases, vec!["Base", "Mixin"]);

        let names: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["greet", "main"]);
        assert!(analysis.has_main_guard);
    }

    #[test]
    fn test_docstring_summary() {
        let analysis = CodeAnalysis::from_source(SAMPLE);
        assert_eq!(analysis.summary_line(), Some("Greeting helpers."));
    }

    #[test]
    fn test_single_quote_docstring() {
        let analysis = CodeAnalysis::from_source("\n'''Tool entry point.'''\nx = 1\n");
        assert_eq!(analysis.docstring.as_deref(), Some("Tool entry point."));
    }

    #[test]
    fn test_no_docstring() {
        let analysis = CodeAnalysis::from_source("import sys\n\"\"\"not a module doc\"\"\"\n");
        assert!(analysis.docstring.is_none());
        assert!(analysis.summary_line().is_none());
        assert!(!analysis.has_main_guard);
    }

    #[test]
    fn test_line_count() {
        assert_eq!(CodeAnalysis::from_source("a = 1\nb = 2").line_count, 2);
        assert_eq!(CodeAnalysis::from_source("").line_count, 1);
    }
}
