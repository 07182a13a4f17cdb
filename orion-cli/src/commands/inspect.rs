//! Classify and scan commands - print collaborator output as JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use orion_core::classify::classify;
use orion_core::scan::scan_repository;

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Instruction to classify
    #[arg(required = true)]
    pub prompt: String,

    /// Repository to scan first, so file mentions can be checked
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl ClassifyArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let scan = self
            .path
            .as_ref()
            .map(|path| {
                scan_repository(path).with_context(|| format!("Failed to scan {}", path.display()))
            })
            .transpose()?;

        let classification = classify(&self.prompt, scan.as_ref());
        println!("{}", serde_json::to_string_pretty(&classification)?);
        Ok(())
    }
}

/// Arguments for the scan command
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Repository root
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

impl ScanArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let scan = scan_repository(&self.path)
            .with_context(|| format!("Failed to scan {}", self.path.display()))?;
        println!("{}", serde_json::to_string_pretty(&scan)?);
        Ok(())
    }
}
