//! Instruction words
//!
//! Every instruction is one little-endian 32-bit word:
//!
//! ```text
//! bits  0..8   opcode
//! bits  8..16  A
//! bits 16..24  C   \
//! bits 24..32  B   /  or D in bits 16..32
//! ```
//!
//! Which of A/B/C/D are meaningful is decided by the opcode table alone.

use serde::{Deserialize, Serialize};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::Result;
use crate::opcode::{self, OpcodeInfo, OperandKind, Slot};

/// Bias subtracted from a raw jump operand to get a signed delta
pub const JUMP_BIAS: i32 = 0x7fff;

/// One decoded instruction
///
/// Only the operands declared by the opcode's table entry are populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Opcode byte (index into the opcode table)
    pub opcode: u8,
    /// Operand A
    pub a: Option<u8>,
    /// Operand B
    pub b: Option<u8>,
    /// Operand C
    pub c: Option<u8>,
    /// Operand D
    pub d: Option<u16>,
}

impl Instruction {
    /// Create an instruction with no operands set
    pub const fn new(opcode: u8) -> Self {
        Self {
            opcode,
            a: None,
            b: None,
            c: None,
            d: None,
        }
    }

    /// Set operand A
    pub const fn with_a(mut self, a: u8) -> Self {
        self.a = Some(a);
        self
    }

    /// Set operand B
    pub const fn with_b(mut self, b: u8) -> Self {
        self.b = Some(b);
        self
    }

    /// Set operand C
    pub const fn with_c(mut self, c: u8) -> Self {
        self.c = Some(c);
        self
    }

    /// Set operand D
    pub const fn with_d(mut self, d: u16) -> Self {
        self.d = Some(d);
        self
    }

    /// Table entry for this opcode
    #[inline]
    pub fn info(&self) -> &'static OpcodeInfo {
        opcode::lookup(self.opcode)
    }

    /// Value stored in a slot, widened to 16 bits
    pub fn operand(&self, slot: Slot) -> Option<u16> {
        match slot {
            Slot::A => self.a.map(u16::from),
            Slot::B => self.b.map(u16::from),
            Slot::C => self.c.map(u16::from),
            Slot::D => self.d,
        }
    }

    /// Decode a raw instruction word
    ///
    /// Opcodes outside the table decode to an instruction with no operands.
    pub fn decode(word: u32) -> Self {
        let opcode = (word & 0xff) as u8;
        let info = opcode::lookup(opcode);
        Self {
            opcode,
            a: info.a.map(|_| (word >> 8) as u8),
            b: info.b.map(|_| (word >> 24) as u8),
            c: info.c.map(|_| (word >> 16) as u8),
            d: info.d.map(|_| (word >> 16) as u16),
        }
    }

    /// Encode to a raw instruction word
    ///
    /// Unset operands are written as zero. When the opcode declares D, the
    /// upper half holds D and any B/C values are ignored.
    pub fn encode(&self) -> u32 {
        let mut word = u32::from(self.opcode) | u32::from(self.a.unwrap_or(0)) << 8;
        if self.info().d.is_some() {
            word |= u32::from(self.d.unwrap_or(0)) << 16;
        } else {
            word |= u32::from(self.c.unwrap_or(0)) << 16;
            word |= u32::from(self.b.unwrap_or(0)) << 24;
        }
        word
    }

    /// Read one instruction word
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self::decode(reader.read_u32()?))
    }

    /// Write one instruction word
    pub fn write(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.encode());
    }

    /// Signed delta of the jump operand, if the opcode has one
    pub fn jump_delta(&self) -> Option<i32> {
        self.info()
            .operands()
            .find(|(_, kind)| *kind == OperandKind::Jump)
            .and_then(|(slot, _)| self.operand(slot))
            .map(|raw| i32::from(raw) - JUMP_BIAS)
    }

    /// Address a jump at `pc` lands on, if the opcode has a jump operand
    pub fn jump_target(&self, pc: usize) -> Option<i64> {
        self.jump_delta()
            .map(|delta| pc as i64 + i64::from(delta))
    }
}
