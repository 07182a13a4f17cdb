//! Python execution environments for generated code

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::workflow::EnvironmentProvider;
use crate::{Error, Result};

/// Directory name of the per-repository virtual environment
pub const VENV_DIR: &str = ".venv";

/// Where generated code runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum Environment {
    /// A virtual environment directory
    Venv(PathBuf),
    /// A named conda environment
    Conda(String),
    /// A bare interpreter on `PATH`
    System(String),
}

impl Environment {
    /// Program and leading arguments that start the interpreter
    pub fn interpreter(&self) -> (String, Vec<String>) {
        match self {
            Self::Venv(path) => (venv_python(path).to_string_lossy().into_owned(), Vec::new()),
            Self::Conda(name) => (
                "conda".to_string(),
                vec![
                    "run".to_string(),
                    "-n".to_string(),
                    name.clone(),
                    "python".to_string(),
                ],
            ),
            Self::System(python) => (python.clone(), Vec::new()),
        }
    }

    /// A command that invokes the interpreter, ready for further arguments
    pub fn command(&self) -> Command {
        let (program, args) = self.interpreter();
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }

    /// Short label for logs and summaries
    pub fn label(&self) -> String {
        match self {
            Self::Venv(path) => format!("venv:{}", path.display()),
            Self::Conda(name) => format!("conda:{}", name),
            Self::System(python) => python.clone(),
        }
    }
}

/// Interpreter path inside a virtual environment
pub fn venv_python(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts").join("python.exe")
    } else {
        venv.join("bin").join("python")
    }
}

/// Creates virtual environments with a base interpreter
#[derive(Debug, Clone)]
pub struct LocalEnvironments {
    python: String,
}

impl LocalEnvironments {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    /// Create `<repo>/.venv`, or reuse it when it already has an interpreter
    ///
    /// Installs `requirements.txt` when the repository has one. A failed
    /// install is logged and the environment is still returned.
    pub async fn create_venv(&self, repo: &Path) -> Result<PathBuf> {
        let venv = repo.join(VENV_DIR);

        if venv_python(&venv).exists() {
            tracing::info!(path = %venv.display(), "Reusing virtual environment");
        } else {
            tracing::info!(path = %venv.display(), python = %self.python, "Creating virtual environment");
            let output = Command::new(&self.python)
                .args(["-m", "venv"])
                .arg(&venv)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| Error::Test(format!("Failed to run {}: {}", self.python, e)))?;

            if !output.status.success() {
                return Err(Error::Test(format!(
                    "venv creation failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }

        let requirements = repo.join("requirements.txt");
        if requirements.exists() {
            let output = Command::new(venv_python(&venv))
                .args(["-m", "pip", "install", "-q", "-r"])
                .arg(&requirements)
                .current_dir(repo)
                .stdin(Stdio::null())
                .output()
                .await;

            match output {
                Ok(out) if out.status.success() => {
                    tracing::info!("Installed requirements.txt");
                }
                Ok(out) => tracing::warn!(
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "pip install failed"
                ),
                Err(e) => tracing::warn!(error = %e, "Could not run pip"),
            }
        }

        Ok(venv)
    }
}

impl Default for LocalEnvironments {
    fn default() -> Self {
        Self::new("python3")
    }
}

#[async_trait]
impl EnvironmentProvider for LocalEnvironments {
    async fn prepare(&self, repo: &Path, create_venv: bool, conda_env: &str) -> Result<Environment> {
        if create_venv {
            Ok(Environment::Venv(self.create_venv(repo).await?))
        } else {
            tracing::info!(env = %conda_env, "Using conda environment");
            Ok(Environment::Conda(conda_env.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_interpreter_forms() {
        let (program, args) = Environment::Conda("ml".to_string()).interpreter();
        assert_eq!(program, "conda");
        assert_eq!(args, vec!["run", "-n", "ml", "python"]);

        let (program, args) = Environment::System("python3".to_string()).interpreter();
        assert_eq!(program, "python3");
        assert!(args.is_empty());

        let venv = PathBuf::from("/tmp/repo/.venv");
        let (program, _) = Environment::Venv(venv.clone()).interpreter();
        assert_eq!(PathBuf::from(program), venv_python(&venv));
    }

    #[test]
    fn test_environment_serializes_tagged() {
        let env = Environment::Conda("ml".to_string());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["kind"], "conda");
        assert_eq!(json["target"], "ml");
    }

    #[tokio::test]
    async fn test_prepare_conda_runs_nothing() {
        let dir = TempDir::new().unwrap();
        let env = LocalEnvironments::new("definitely-not-a-python")
            .prepare(dir.path(), false, "ml")
            .await
            .unwrap();
        assert_eq!(env, Environment::Conda("ml".to_string()));
    }

    #[tokio::test]
    async fn test_existing_venv_reused() {
        let dir = TempDir::new().unwrap();
        let python = venv_python(&dir.path().join(VENV_DIR));
        std::fs::create_dir_all(python.parent().unwrap()).unwrap();
        std::fs::write(&python, "").unwrap();

        let env = LocalEnvironments::new("definitely-not-a-python")
            .prepare(dir.path(), true, "ml")
            .await
            .unwrap();
        assert_eq!(env, Environment::Venv(dir.path().join(VENV_DIR)));
    }

    #[tokio::test]
    async fn test_missing_base_interpreter_is_error() {
        let dir = TempDir::new().unwrap();
        let result = LocalEnvironments::new("definitely-not-a-python")
            .prepare(dir.path(), true, "ml")
            .await;
        assert!(matches!(result, Err(Error::Test(_))));
    }
}
