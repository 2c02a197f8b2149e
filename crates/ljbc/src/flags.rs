//! Open-ended flag sets
//!
//! Flags are kept as raw integers so bits introduced by newer producers
//! survive a decode/encode cycle. Only rendering consults the name tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of one set bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagName {
    /// Bit with a symbolic name
    Known(&'static str),
    /// Bit with no symbolic name, as its raw value
    Unknown(u32),
}

impl fmt::Display for FlagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(name) => f.write_str(name),
            Self::Unknown(bit) => write!(f, "{bit:#x}"),
        }
    }
}

/// A bitset with a static bit-to-name table
pub trait FlagSet {
    /// Known bits and their names, lowest bit first
    const NAMES: &'static [(u32, &'static str)];

    /// Raw bits
    fn bits(&self) -> u32;

    /// Check whether every bit of `mask` is set
    fn contains(&self, mask: u32) -> bool {
        self.bits() & mask == mask
    }

    /// One name per set bit, in ascending bit order
    fn names(&self) -> Vec<FlagName> {
        let bits = self.bits();
        (0..u32::BITS)
            .map(|shift| 1u32 << shift)
            .filter(|bit| bits & bit != 0)
            .map(|bit| {
                Self::NAMES
                    .iter()
                    .find(|(known, _)| *known == bit)
                    .map_or(FlagName::Unknown(bit), |(_, name)| FlagName::Known(*name))
            })
            .collect()
    }

    /// Bits set here that have no symbolic name
    fn unknown_bits(&self) -> u32 {
        let known = Self::NAMES.iter().fold(0, |acc, (bit, _)| acc | bit);
        self.bits() & !known
    }
}

/// Container-level flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerFlags(pub u32);

impl ContainerFlags {
    /// Multi-byte fields were written big-endian
    pub const BIG_ENDIAN: u32 = 0x01;
    /// Debug info was stripped
    pub const STRIP: u32 = 0x02;
    /// Uses FFI
    pub const FFI: u32 = 0x04;
    /// Produced by a 64-bit (two-slot frame) build
    pub const FR2: u32 = 0x08;

    /// Check for stripped debug info
    #[inline]
    pub fn is_stripped(self) -> bool {
        self.contains(Self::STRIP)
    }
}

impl FlagSet for ContainerFlags {
    const NAMES: &'static [(u32, &'static str)] = &[
        (Self::BIG_ENDIAN, "BigEndian"),
        (Self::STRIP, "StripDebugInfo"),
        (Self::FFI, "UsesFfi"),
        (Self::FR2, "Fr2"),
    ];

    #[inline]
    fn bits(&self) -> u32 {
        self.0
    }
}

/// Prototype-level flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrototypeFlags(pub u8);

impl PrototypeFlags {
    /// Has child prototypes
    pub const CHILD: u8 = 0x01;
    /// Vararg function
    pub const VARARG: u8 = 0x02;
    /// Uses cdata constants
    pub const FFI: u8 = 0x04;
    /// JIT disabled for this function
    pub const NOJIT: u8 = 0x08;
    /// Loops were patched to interpreter-only variants
    pub const ILOOP: u8 = 0x10;

    /// Check for the vararg bit
    #[inline]
    pub fn is_vararg(self) -> bool {
        self.contains(Self::VARARG.into())
    }
}

impl FlagSet for PrototypeFlags {
    const NAMES: &'static [(u32, &'static str)] = &[
        (Self::CHILD as u32, "HasChildren"),
        (Self::VARARG as u32, "Vararg"),
        (Self::FFI as u32, "UsesFfiCData"),
        (Self::NOJIT as u32, "NoJit"),
        (Self::ILOOP as u32, "PatchLoop"),
    ];

    #[inline]
    fn bits(&self) -> u32 {
        self.0.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_names() {
        let flags = ContainerFlags(ContainerFlags::STRIP | 0x40);
        assert_eq!(
            flags.names(),
            vec![FlagName::Known("StripDebugInfo"), FlagName::Unknown(0x40)]
        );
        assert_eq!(flags.unknown_bits(), 0x40);
        assert!(flags.is_stripped());
        assert_eq!(FlagName::Unknown(0x40).to_string(), "0x40");
    }

    #[test]
    fn test_empty_flags() {
        assert!(ContainerFlags::default().names().is_empty());
        assert!(!ContainerFlags::default().is_stripped());
    }

    #[test]
    fn test_prototype_flags() {
        let flags = PrototypeFlags(PrototypeFlags::CHILD | PrototypeFlags::VARARG | 0x80);
        assert!(flags.is_vararg());
        let names: Vec<String> = flags.names().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["HasChildren", "Vararg", "0x80"]);
    }
}
