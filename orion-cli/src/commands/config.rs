//! Config command - show or initialize configuration

use anyhow::Context;
use clap::Args;
use orion_core::{Config, Secrets};

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write config and secrets templates to their default locations
    #[arg(long)]
    pub init: bool,
}

impl ConfigArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if self.init {
            return init();
        }

        println!("Orion Configuration");
        println!("===================");
        println!();
        println!("LLM Settings:");
        println!("  api_url: {}", config.llm.api_url);
        println!("  model: {}", config.llm.model);
        println!("  temperature: {}", config.llm.temperature);
        println!("  max_tokens: {}", config.llm.max_tokens);
        println!();
        println!("Workflow Settings:");
        match config.workdir() {
            Ok(dir) => println!("  workdir: {}", dir.display()),
            Err(e) => println!("  workdir: (unavailable: {})", e),
        }
        println!("  max_retries: {}", config.workflow.max_retries);
        println!(
            "  checkpoint_dir: {}",
            config
                .workflow
                .checkpoint_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "(in-memory)".to_string())
        );
        println!();
        println!("Testing Settings:");
        println!("  timeout: {:?}", config.testing.timeout);
        println!("  python: {}", config.testing.python);
        println!("  conda_env: {}", config.testing.conda_env);
        println!();

        let secrets = Secrets::load().context("Failed to load secrets")?;
        println!("Credentials:");
        println!("  github token: {}", present(secrets.github_token().is_some()));
        println!("  llm api key: {}", present(secrets.llm_api_key().is_some()));
        println!();

        if let Some(path) = Config::default_config_path() {
            println!("Config file: {}", path.display());
            if path.exists() {
                println!("  (exists)");
            } else {
                println!("  (not found - using defaults)");
            }
        }
        Ok(())
    }
}

fn init() -> anyhow::Result<()> {
    let config_path =
        Config::default_config_path().context("Could not determine config directory")?;
    if config_path.exists() {
        println!("Config file already exists: {}", config_path.display());
    } else {
        Config::write_default(&config_path).context("Failed to write config file")?;
        println!("Wrote config file: {}", config_path.display());
    }

    match Secrets::default_secrets_path() {
        Some(path) if path.exists() => {
            println!("Secrets file already exists: {}", path.display());
        }
        _ => {
            let path = Secrets::create_template().context("Failed to write secrets template")?;
            println!("Wrote secrets template: {}", path.display());
            println!("  Edit it to add your GitHub token and LLM API key");
        }
    }
    Ok(())
}

fn present(found: bool) -> &'static str {
    if found {
        "configured"
    } else {
        "not set"
    }
}
