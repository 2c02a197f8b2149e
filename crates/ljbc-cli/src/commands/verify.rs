//! Verify command - decode, re-encode and compare.

use anyhow::{Result, bail};
use clap::Args;
use std::path::PathBuf;

use crate::commands::load;

#[derive(Args)]
pub struct VerifyCommand {
    /// Bytecode file to check
    pub input: PathBuf,
}

impl VerifyCommand {
    pub fn run(&self) -> Result<()> {
        let (bytes, container) = load(&self.input)?;
        let encoded = ljbc::encode(&container);

        match first_difference(&bytes, &encoded) {
            None => {
                println!("{}: ok ({} bytes)", self.input.display(), bytes.len());
                Ok(())
            }
            Some(offset) => bail!(
                "{}: re-encoded output differs at offset {} ({} bytes read, {} bytes written)",
                self.input.display(),
                offset,
                bytes.len(),
                encoded.len()
            ),
        }
    }
}

/// Offset of the first byte where `a` and `b` differ, including length mismatch
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}
