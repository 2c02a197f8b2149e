//! Dump command - write the decoded tree as JSON.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::commands::load;

#[derive(Args)]
pub struct DumpCommand {
    /// Bytecode file to dump
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl DumpCommand {
    pub fn run(&self) -> Result<()> {
        let (_, container) = load(&self.input)?;
        let json = serde_json::to_string_pretty(&container)?;

        match &self.output {
            Some(output) => std::fs::write(output, json)
                .with_context(|| format!("Failed to write {}", output.display()))?,
            None => println!("{json}"),
        }
        Ok(())
    }
}
