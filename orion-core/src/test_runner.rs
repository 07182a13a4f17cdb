//! Syntax check and execution of generated Python files
//!
//! Each file is compiled with `py_compile` first and only executed when that
//! succeeds. Execution runs with stdin closed, so scripts that prompt for
//! input fail fast instead of hanging, and is bounded by a wall-clock timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::workflow::CodeTester;
use crate::{Error, Result};

/// Longest output kept per file
const MAX_OUTPUT_CHARS: usize = 4000;

/// Outcome for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTestResult {
    pub file: String,
    pub syntax_ok: bool,
    pub passed: bool,
    /// Not a Python file, or absent from the working tree
    pub skipped: bool,
    pub output: String,
    pub error: Option<String>,
}

impl FileTestResult {
    fn skipped(file: &str, reason: &str) -> Self {
        Self {
            file: file.to_string(),
            syntax_ok: false,
            passed: false,
            skipped: true,
            output: String::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// Results of one test run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestReport {
    pub files: Vec<FileTestResult>,
    /// True when every non-skipped file passed
    pub all_passed: bool,
    pub duration_ms: u64,
}

impl TestReport {
    pub fn passed(&self) -> usize {
        self.files.iter().filter(|f| !f.skipped && f.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| !f.skipped && !f.passed).count()
    }

    pub fn skipped(&self) -> usize {
        self.files.iter().filter(|f| f.skipped).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped ({}ms)",
            self.passed(),
            self.failed(),
            self.skipped(),
            self.duration_ms
        )
    }
}

/// Runs generated Python files in a prepared environment
#[derive(Debug, Clone)]
pub struct PythonTester {
    timeout: Duration,
}

impl PythonTester {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the per-file execution timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Test each file, relative to `repo`
    pub async fn run_files(
        &self,
        repo: &Path,
        env: &Environment,
        files: &[String],
    ) -> Result<TestReport> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(files.len());

        for file in files {
            if !file.ends_with(".py") {
                results.push(FileTestResult::skipped(file, "not a Python file"));
                continue;
            }
            if !repo.join(file).is_file() {
                tracing::warn!(file = %file, "File to test does not exist");
                results.push(FileTestResult::skipped(file, "file not found"));
                continue;
            }
            results.push(self.test_file(repo, env, file).await?);
        }

        let all_passed = results.iter().all(|r| r.skipped || r.passed);
        let report = TestReport {
            files: results,
            all_passed,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        tracing::info!(summary = %report.summary(), "Test run finished");
        Ok(report)
    }

    async fn test_file(&self, repo: &Path, env: &Environment, file: &str) -> Result<FileTestResult> {
        let mut result = FileTestResult {
            file: file.to_string(),
            syntax_ok: false,
            passed: false,
            skipped: false,
            output: String::new(),
            error: None,
        };

        let syntax = env
            .command()
            .args(["-m", "py_compile", file])
            .current_dir(repo)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Test(format!("Failed to start {}: {}", env.label(), e)))?;

        if !syntax.status.success() {
            tracing::warn!(file = %file, "Syntax check failed");
            result.error = Some(format!(
                "Syntax error: {}",
                truncate(String::from_utf8_lossy(&syntax.stderr).trim())
            ));
            return Ok(result);
        }
        result.syntax_ok = true;

        let mut cmd = env.command();
        cmd.arg(file)
            .current_dir(repo)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                tracing::warn!(file = %file, timeout = ?self.timeout, "Execution timed out");
                result.error = Some(format!(
                    "Execution timed out after {}s",
                    self.timeout.as_secs_f32()
                ));
            }
            Ok(Err(e)) => {
                return Err(Error::Test(format!("Failed to run {}: {}", file, e)));
            }
            Ok(Ok(output)) => {
                result.output = truncate(&String::from_utf8_lossy(&output.stdout));
                result.passed = output.status.success();
                if !result.passed {
                    result.error = Some(truncate(String::from_utf8_lossy(&output.stderr).trim()));
                }
                tracing::debug!(file = %file, passed = result.passed, "Executed file");
            }
        }

        Ok(result)
    }
}

impl Default for PythonTester {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeTester for PythonTester {
    async fn run(&self, repo: &Path, env: &Environment, files: &[String]) -> Result<TestReport> {
        self.run_files(repo, env, files).await
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
    out.push_str("\n... (truncated)");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn system(program: &str) -> Environment {
        Environment::System(program.to_string())
    }

    #[tokio::test]
    async fn test_non_python_and_missing_files_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "# hi").unwrap();

        let report = PythonTester::new()
            .run_files(
                dir.path(),
                &system("definitely-not-a-python"),
                &["README.md".to_string(), "missing.py".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(report.skipped(), 2);
        assert!(report.all_passed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stub_interpreter_pass_and_fail() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.py"), "print('ok')\n").unwrap();
        let files = vec!["ok.py".to_string()];

        let report = PythonTester::new()
            .run_files(dir.path(), &system("true"), &files)
            .await
            .unwrap();
        assert!(report.all_passed);
        assert!(report.files[0].syntax_ok);

        let report = PythonTester::new()
            .run_files(dir.path(), &system("false"), &files)
            .await
            .unwrap();
        assert!(!report.all_passed);
        assert!(!report.files[0].syntax_ok);
        assert_eq!(report.failed(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execution_timeout_is_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let stub = dir.path().join("slow-python");
        std::fs::write(
            &stub,
            "#!/bin/sh\nif [ \"$1\" = \"-m\" ]; then exit 0; fi\nsleep 5\n",
        )
        .unwrap();
        std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(dir.path().join("app.py"), "input()\n").unwrap();

        let report = PythonTester::new()
            .with_timeout(Duration::from_millis(200))
            .run_files(
                dir.path(),
                &system(stub.to_str().unwrap()),
                &["app.py".to_string()],
            )
            .await
            .unwrap();

        assert!(!report.all_passed);
        let result = &report.files[0];
        assert!(result.syntax_ok);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
    }

    #[test]
    fn test_truncate() {
        let long = "x".repeat(MAX_OUTPUT_CHARS + 10);
        assert!(truncate(&long).ends_with("(truncated)"));
        assert_eq!(truncate("short"), "short");
    }
}
