//! Info command - summarize a bytecode file.

use anyhow::Result;
use clap::Args;
use ljbc::{Container, FlagSet};
use serde::Serialize;
use std::path::PathBuf;

use crate::commands::load;

#[derive(Args)]
pub struct InfoCommand {
    /// Bytecode file to inspect
    pub input: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InfoCommand {
    pub fn run(&self) -> Result<()> {
        let (bytes, container) = load(&self.input)?;
        let summary = Summary::collect(bytes.len(), &container);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", self.input.display());
            summary.print_human_readable();
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub size: usize,
    pub version: u8,
    pub flags: Vec<String>,
    pub prototypes: usize,
    pub instructions: usize,
    pub gc_constants: usize,
    pub numeric_constants: usize,
}

impl Summary {
    pub fn collect(size: usize, container: &Container) -> Self {
        let mut summary = Self {
            size,
            version: container.version,
            flags: container
                .flags
                .names()
                .iter()
                .map(ToString::to_string)
                .collect(),
            prototypes: 0,
            instructions: 0,
            gc_constants: 0,
            numeric_constants: 0,
        };
        for proto in container.root.walk() {
            summary.prototypes += 1;
            summary.instructions += proto.instructions.len();
            summary.gc_constants += proto.gc_constants.len();
            summary.numeric_constants += proto.numeric_constants.len();
        }
        summary
    }

    fn print_human_readable(&self) {
        let flags = if self.flags.is_empty() {
            "none".to_string()
        } else {
            self.flags.join(", ")
        };
        println!("  Size:        {} bytes", self.size);
        println!("  Version:     {}", self.version);
        println!("  Flags:       {}", flags);
        println!("  Prototypes:  {}", self.prototypes);
        println!("  Instructions: {}", self.instructions);
        println!(
            "  Constants:   {} gc, {} numeric",
            self.gc_constants, self.numeric_constants
        );
    }
}
