//! Container framing
//!
//! ```text
//! 1B 4C 4A    magic
//! u8          version
//! uleb        flags
//! ...         prototype bodies, children before parents
//! 00          terminator
//! ```

use serde::{Deserialize, Serialize};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{DecodeError, Result};
use crate::flags::{ContainerFlags, FlagSet};
use crate::prototype::{Prototype, ResolutionStack};

/// Magic bytes at the start of every dump: `ESC 'L' 'J'`
pub const MAGIC: [u8; 3] = [0x1b, b'L', b'J'];

/// Format versions with a known layout
pub const KNOWN_VERSIONS: [u8; 2] = [1, 2];

/// One decoded bytecode dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Format version
    pub version: u8,
    /// Container flags
    pub flags: ContainerFlags,
    /// Top-level chunk
    pub root: Prototype,
}

impl Container {
    /// Create a container around a root prototype
    pub fn new(version: u8, flags: ContainerFlags, root: Prototype) -> Self {
        Self {
            version,
            flags,
            root,
        }
    }

    /// Decode a complete dump
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);

        let magic: [u8; 3] = match reader.read_bytes(MAGIC.len()) {
            Ok(found) => [found[0], found[1], found[2]],
            Err(_) => {
                let mut found = [0u8; 3];
                found[..bytes.len()].copy_from_slice(bytes);
                return Err(DecodeError::Format { found });
            }
        };
        if magic != MAGIC {
            return Err(DecodeError::Format { found: magic });
        }

        let version = reader.read_u8()?;
        if !KNOWN_VERSIONS.contains(&version) {
            tracing::warn!(
                "unknown bytecode version {}, assuming the version 2 layout",
                version
            );
        }
        let flags = ContainerFlags(reader.read_uleb128()?);
        if flags.unknown_bits() != 0 {
            tracing::warn!("unknown container flag bits {:#x}", flags.unknown_bits());
        }
        tracing::trace!("container header: version {}, flags {:#x}", version, flags.0);

        let mut stack = ResolutionStack::new();
        loop {
            let len = reader.read_uleb128()? as usize;
            if len == 0 {
                break;
            }
            let mut body = reader.sub_reader(len)?;
            let proto = Prototype::read_body(&mut body, &mut stack)?;
            stack.push(proto);
        }

        if !reader.is_empty() {
            tracing::warn!(
                "ignoring {} byte(s) after the terminator at offset {}",
                reader.remaining(),
                reader.offset()
            );
        }

        let root = stack.finish()?;
        tracing::debug!(
            "decoded container: version {}, {} prototype(s)",
            version,
            root.tree_size()
        );

        Ok(Self {
            version,
            flags,
            root,
        })
    }

    /// Encode back to the exact wire layout
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&MAGIC);
        writer.write_u8(self.version);
        writer.write_uleb128(self.flags.0);
        self.root.write(&mut writer);
        writer.write_u8(0);

        tracing::debug!(
            "encoded container: {} bytes, {} prototype(s)",
            writer.len(),
            self.root.tree_size()
        );
        writer.into_bytes()
    }
}
