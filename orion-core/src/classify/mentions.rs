//! File-mention extraction from free-text instructions

use std::sync::LazyLock;

use regex::Regex;

/// Extension-qualified paths, e.g. `src/app.py` or `config.json`
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z_][a-z0-9_/.-]*\.(?:py|js|json|yaml|yml|toml|cfg|ini|md|txt))\b")
        .unwrap()
});

/// `in foo`, `file foo`, `script foo`
static PRECEDED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:in|file|script)\s+([a-z_][a-z0-9_]*)\b").unwrap());

/// `foo file`, `foo script`, `foo module`
static FOLLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z_][a-z0-9_]*)\s+(?:file|script|module)\b").unwrap());

/// Identifiers that read as ordinary words rather than file names
const STOP_WORDS: &[&str] = &[
    "the", "this", "that", "these", "those", "each", "every", "any", "all", "some", "new", "our",
    "your", "its", "existing", "current", "same", "python", "config", "test", "one",
    "another", "which", "order", "addition", "case", "place", "file", "script", "module",
];

/// Extract mentioned files in first-occurrence order
///
/// Extension-qualified paths are collected first. Bare identifiers are added
/// only when they are not a stop word, not shorter than three characters, and
/// not the stem of an already collected path.
pub fn extract_mentioned_files(prompt: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for caps in PATH_RE.captures_iter(prompt) {
        let path = caps[1].trim_end_matches('.').to_string();
        let is_suffix_of_known = found
            .iter()
            .any(|f| f == &path || f.ends_with(&format!("/{}", path)));
        if !is_suffix_of_known {
            found.push(path);
        }
    }

    let stems: Vec<String> = found.iter().map(|f| stem(f).to_lowercase()).collect();

    let mut bare: Vec<(usize, String)> = PRECEDED_RE
        .captures_iter(prompt)
        .chain(FOLLOWED_RE.captures_iter(prompt))
        .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.as_str().to_string())))
        .collect();
    bare.sort_by_key(|(pos, _)| *pos);

    for (_, ident) in bare {
        let lower = ident.to_lowercase();
        if ident.len() <= 2
            || STOP_WORDS.contains(&lower.as_str())
            || stems.contains(&lower)
            || found.contains(&ident)
        {
            continue;
        }
        found.push(ident);
    }

    found
}

fn stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.split('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_qualified() {
        assert_eq!(extract_mentioned_files("Fix the bug in app.py"), vec!["app.py"]);
    }

    #[test]
    fn test_paths_and_order() {
        let files = extract_mentioned_files("Update src/config.json and then README.md");
        assert_eq!(files, vec!["src/config.json", "README.md"]);
    }

    #[test]
    fn test_js_not_confused_with_json() {
        assert_eq!(extract_mentioned_files("edit package.json"), vec!["package.json"]);
        assert_eq!(extract_mentioned_files("edit index.js now"), vec!["index.js"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let files = extract_mentioned_files("Fix app.py, then test app.py again");
        assert_eq!(files, vec!["app.py"]);
    }

    #[test]
    fn test_bare_identifier() {
        let files = extract_mentioned_files("Add logging to the utils module");
        assert_eq!(files, vec!["utils"]);

        let files = extract_mentioned_files("rename variables in helpers");
        assert_eq!(files, vec!["helpers"]);
    }

    #[test]
    fn test_stop_words_ignored() {
        assert!(extract_mentioned_files("Create a new python script").is_empty());
        assert!(extract_mentioned_files("fix the file").is_empty());
        assert!(extract_mentioned_files("").is_empty());
    }

    #[test]
    fn test_trailing_period() {
        assert_eq!(extract_mentioned_files("Please fix main.py."), vec!["main.py"]);
    }
}
