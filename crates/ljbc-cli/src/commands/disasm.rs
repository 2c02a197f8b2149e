//! Disasm command - write a listing for a bytecode file.

use anyhow::{Context, Result};
use clap::Args;
use ljbc::Disassembler;
use std::path::PathBuf;

use crate::commands::{load, output_path};
use crate::config::Config;

#[derive(Args)]
pub struct DisasmCommand {
    /// Bytecode file to disassemble
    pub input: PathBuf,

    /// Output file (defaults to the input path plus the configured extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print the listing instead of writing a file
    #[arg(long, conflicts_with = "output")]
    pub stdout: bool,
}

impl DisasmCommand {
    pub fn run(&self, config: &Config) -> Result<()> {
        let (_, container) = load(&self.input)?;
        let text = Disassembler::with_options(config.disasm).disassemble(&container);

        if self.stdout {
            print!("{text}");
            return Ok(());
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| output_path(&self.input, &config.output.extension));
        std::fs::write(&output, text)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        tracing::info!("wrote {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use tempfile::tempdir;

    #[test]
    fn test_writes_next_to_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.luac");
        std::fs::write(&input, ljbc::encode(&fixtures::sample())).unwrap();

        let cmd = DisasmCommand {
            input: input.clone(),
            output: None,
            stdout: false,
        };
        cmd.run(&Config::default()).unwrap();

        let text = std::fs::read_to_string(dir.path().join("sample.luac.luas")).unwrap();
        assert!(text.contains("; flags: StripDebugInfo"));
        assert!(text.contains("@0 = \"name\""));
        assert!(text.contains("fnew   %0, @1"));
    }

    #[test]
    fn test_explicit_output_and_options() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("sample.luac");
        let output = dir.path().join("listing.txt");
        std::fs::write(&input, ljbc::encode(&fixtures::sample())).unwrap();

        let mut config = Config::default();
        config.disasm.show_header = false;
        let cmd = DisasmCommand {
            input,
            output: Some(output.clone()),
            stdout: false,
        };
        cmd.run(&config).unwrap();

        let text = std::fs::read_to_string(output).unwrap();
        assert!(!text.contains("; version"));
        assert!(text.contains("ret1   %%0, 2"));
    }
}
