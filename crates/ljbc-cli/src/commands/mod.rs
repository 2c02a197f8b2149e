//! CLI command implementations.

pub mod disasm;
pub mod dump;
pub mod info;
pub mod verify;

use anyhow::{Context, Result};
use ljbc::Container;
use std::path::{Path, PathBuf};

/// Read and decode a bytecode file, keeping the raw bytes
pub fn load(path: &Path) -> Result<(Vec<u8>, Container)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let container =
        ljbc::decode(&bytes).with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok((bytes, container))
}

/// `input` with `.extension` appended, keeping the original extension
pub fn output_path(input: &Path, extension: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ljbc::{Container, ContainerFlags, GcConstant, Instruction, Prototype, opcode};

    /// A stripped chunk with one child and a string constant
    pub fn sample() -> Container {
        let op = |name: &str| opcode::find(name).unwrap();
        let child = Prototype {
            frame_size: 1,
            instructions: vec![Instruction::new(op("RET0")).with_a(0).with_d(1)],
            ..Prototype::default()
        };
        let root = Prototype {
            frame_size: 2,
            instructions: vec![
                Instruction::new(op("FNEW")).with_a(0).with_d(1),
                Instruction::new(op("RET1")).with_a(0).with_d(2),
            ],
            gc_constants: vec![GcConstant::Bytes(b"name".to_vec()), GcConstant::Child(0)],
            children: vec![child],
            ..Prototype::default()
        };
        Container::new(2, ContainerFlags(ContainerFlags::STRIP), root)
    }
}
