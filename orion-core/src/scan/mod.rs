//! Repository scanning
//!
//! Walks a working copy and builds a file inventory plus lightweight static
//! analysis of Python sources. The scan is read-only.

mod analysis;

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{Error, Result};

pub use analysis::{CodeAnalysis, Definition};

/// Directory and file names never descended into or inventoried
pub const IGNORED_NAMES: &[&str] = &[
    ".git",
    "__pycache__",
    ".pytest_cache",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    "dist",
    "build",
    ".DS_Store",
];

const TEXT_EXTENSIONS: &[&str] = &[
    ".py", ".txt", ".md", ".json", ".yaml", ".yml", ".toml", ".cfg", ".ini", ".sh", ".bash",
    ".zsh", ".fish", ".ps1", ".js", ".ts", ".html", ".css", ".xml", ".csv", ".sql",
    ".dockerfile", ".gitignore", ".gitattributes",
];

const CONFIG_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml", ".toml", ".cfg"];

/// Size window (bytes, inclusive) for Python modification candidates
const CANDIDATE_MIN_BYTES: u64 = 50;
const CANDIDATE_MAX_BYTES: u64 = 10_000;

/// Upper bound for [`RepositoryScan::read_file`]
const MAX_READ_BYTES: u64 = 1024 * 1024;

static IGNORED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| IGNORED_NAMES.iter().copied().collect());

/// Metadata for one inventoried file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub size_bytes: u64,
    /// Extension with leading dot, empty when absent
    pub extension: String,
    pub is_text: bool,
    pub is_python: bool,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Result of scanning a repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryScan {
    pub root: PathBuf,
    /// Relative path (forward slashes) to metadata, sorted by path
    pub file_inventory: BTreeMap<String, FileInfo>,
    /// Extension (or `no_extension`) to count
    pub file_type_counts: BTreeMap<String, usize>,
    pub python_files: Vec<String>,
    pub modification_candidates: Vec<String>,
    pub code_analysis: BTreeMap<String, CodeAnalysis>,
}

impl RepositoryScan {
    /// Number of inventoried files
    pub fn total_files(&self) -> usize {
        self.file_inventory.len()
    }

    /// Find inventoried files matching a pattern
    ///
    /// `*.ext` matches by extension, anything else is a case-insensitive
    /// substring match on the relative path.
    pub fn find_files(&self, pattern: &str) -> Vec<String> {
        let pattern = pattern.to_lowercase();
        if let Some(ext) = pattern.strip_prefix('*') {
            return self
                .file_inventory
                .iter()
                .filter(|(_, info)| info.extension.to_lowercase() == ext)
                .map(|(path, _)| path.clone())
                .collect();
        }
        self.file_inventory
            .keys()
            .filter(|path| path.to_lowercase().contains(&pattern))
            .cloned()
            .collect()
    }

    /// Read an inventoried file's contents
    pub fn read_file(&self, relative: &str) -> Result<String> {
        if !self.file_inventory.contains_key(relative) {
            return Err(Error::Other(format!("File not in scan: {}", relative)));
        }
        let path = self.root.join(relative);
        let mut buf = Vec::new();
        File::open(&path)?
            .take(MAX_READ_BYTES)
            .read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Compact description used as model context
    pub fn context_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Total files: {}", self.total_files())];

        if !self.file_type_counts.is_empty() {
            let types: Vec<String> = self
                .file_type_counts
                .iter()
                .map(|(ext, n)| format!("{} ({})", ext, n))
                .collect();
            lines.push(format!("File types: {}", types.join(", ")));
        }

        for path in &self.python_files {
            let Some(analysis) = self.code_analysis.get(path) else {
                continue;
            };
            let classes: Vec<&str> = analysis.classes.iter().map(|c| c.name.as_str()).collect();
            let functions: Vec<&str> =
                analysis.functions.iter().map(|f| f.name.as_str()).collect();
            lines.push(format!(
                "{}: classes [{}], functions [{}]",
                path,
                classes.join(", "),
                functions.join(", ")
            ));
        }

        if !self.modification_candidates.is_empty() {
            lines.push(format!(
                "Modification candidates: {}",
                self.modification_candidates.join(", ")
            ));
        }

        lines
    }
}

/// Scan a repository rooted at `root`
///
/// Files that cannot be opened, and Python files that are not valid UTF-8,
/// are left out of the inventory.
pub fn scan_repository(root: impl AsRef<Path>) -> Result<RepositoryScan> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Repository path does not exist: {}",
            root.display()
        )));
    }

    info!(path = %root.display(), "Scanning repository");

    let mut scan = RepositoryScan {
        root: root.to_path_buf(),
        ..Default::default()
    };

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .map_or(true, |name| !IGNORED.contains(name))
        });

    for entry in walker {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(relative) = relative_path(root, path) else {
            continue;
        };

        let Some((info, analysis)) = inspect_file(path) else {
            debug!(path = %relative, "Skipping unreadable file");
            continue;
        };

        let ext_key = if info.extension.is_empty() {
            "no_extension".to_string()
        } else {
            info.extension.to_lowercase()
        };
        *scan.file_type_counts.entry(ext_key).or_default() += 1;

        if let Some(analysis) = analysis {
            scan.code_analysis.insert(relative.clone(), analysis);
        }
        scan.file_inventory.insert(relative, info);
    }

    for (path, info) in &scan.file_inventory {
        if info.is_python {
            scan.python_files.push(path.clone());
        }
        if is_modification_candidate(info) {
            scan.modification_candidates.push(path.clone());
        }
    }

    info!(
        files = scan.total_files(),
        python = scan.python_files.len(),
        "Repository scan complete"
    );

    Ok(scan)
}

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn inspect_file(path: &Path) -> Option<(FileInfo, Option<CodeAnalysis>)> {
    let metadata = std::fs::metadata(path).ok()?;
    let mut file = File::open(path).ok()?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let is_python = extension == ".py";

    let (is_text, analysis) = if is_python {
        let mut content = String::new();
        file.read_to_string(&mut content).ok()?;
        (true, Some(CodeAnalysis::from_source(&content)))
    } else if extension.is_empty() {
        let mut head = Vec::with_capacity(1024);
        (&mut file).take(1024).read_to_end(&mut head).ok()?;
        (head.is_ascii(), None)
    } else {
        (TEXT_EXTENSIONS.contains(&extension.to_lowercase().as_str()), None)
    };

    let info = FileInfo {
        size_bytes: metadata.len(),
        extension,
        is_text,
        is_python,
        last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    };

    Some((info, analysis))
}

fn is_modification_candidate(info: &FileInfo) -> bool {
    if info.is_python {
        return (CANDIDATE_MIN_BYTES..=CANDIDATE_MAX_BYTES).contains(&info.size_bytes);
    }
    CONFIG_EXTENSIONS.contains(&info.extension.as_str())
}
