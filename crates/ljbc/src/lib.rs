//! # ljbc
//!
//! Codec and disassembler for LuaJIT bytecode dumps (`luajit -b` output).
//!
//! ## Design Principles
//!
//! - **Exact**: `encode(decode(bytes))` reproduces the input byte for byte
//! - **Tolerant**: unknown opcodes, flag bits and versions decode instead of failing
//! - **Owned tree**: child prototypes are moved into their parent while decoding,
//!   so the result is a plain tree with no shared ownership
//!
//! ```
//! let container = ljbc::Container::new(2, Default::default(), Default::default());
//! let bytes = ljbc::encode(&container);
//! assert_eq!(&bytes[..3], &ljbc::MAGIC);
//! assert_eq!(ljbc::decode(&bytes).unwrap(), container);
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod container;
pub mod cursor;
pub mod disasm;
pub mod error;
pub mod flags;
pub mod instruction;
pub mod numeric;
pub mod opcode;
pub mod prototype;
pub mod text;

pub use constant::{ConstantTable, ConstantTableValue, GcConstant, NumericConstant};
pub use container::{Container, MAGIC};
pub use disasm::{DisasmOptions, Disassembler};
pub use error::{DecodeError, ResolveFault, Result};
pub use flags::{ContainerFlags, FlagName, FlagSet, PrototypeFlags};
pub use instruction::Instruction;
pub use opcode::{OpcodeInfo, OperandKind};
pub use prototype::{Prototype, Upvalue};

/// Decode a complete bytecode dump
pub fn decode(bytes: &[u8]) -> Result<Container> {
    Container::from_bytes(bytes)
}

/// Encode a container to its wire layout
pub fn encode(container: &Container) -> Vec<u8> {
    container.to_bytes()
}

/// Render a container with default [`DisasmOptions`]
pub fn disassemble(container: &Container) -> String {
    Disassembler::new().disassemble(container)
}
