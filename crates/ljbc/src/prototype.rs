//! Function prototypes and the nesting reconstruction
//!
//! A dump stores prototypes in post-order: every child appears, fully
//! serialized, before the prototype that declares it. Decoding pushes each
//! finished prototype onto a [`ResolutionStack`]; a child constant in a later
//! prototype pops the most recent unclaimed one and takes ownership of it.
//!
//! Body layout, inside a ULEB128 length prefix:
//!
//! ```text
//! u8      flags
//! u8      param_count
//! u8      frame_size
//! u8      upvalue count
//! uleb    gc constant count
//! uleb    numeric constant count
//! uleb    instruction count
//! u32*    instructions
//! u16*    upvalues
//! ...     gc constants, last declared first
//! ...     numeric constants, in order
//! ```

use serde::{Deserialize, Serialize};

use crate::constant::{ChildResolver, GcConstant, NumericConstant};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{DecodeError, ResolveFault, Result};
use crate::flags::{FlagSet, PrototypeFlags};
use crate::instruction::Instruction;

/// An upvalue descriptor: a 14-bit slot index plus two marker bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Upvalue(pub u16);

impl Upvalue {
    /// Captures a local of the enclosing function (otherwise one of its upvalues)
    pub const LOCAL: u16 = 0x8000;
    /// The captured variable is never reassigned
    pub const IMMUTABLE: u16 = 0x4000;
    /// Bits holding the slot index
    pub const SLOT_MASK: u16 = 0x3fff;

    /// Build a descriptor from its parts; `slot` is truncated to 14 bits
    pub const fn new(slot: u16, local: bool, immutable: bool) -> Self {
        let mut raw = slot & Self::SLOT_MASK;
        if local {
            raw |= Self::LOCAL;
        }
        if immutable {
            raw |= Self::IMMUTABLE;
        }
        Self(raw)
    }

    /// Slot index in the enclosing function
    #[inline]
    pub const fn slot(self) -> u16 {
        self.0 & Self::SLOT_MASK
    }

    /// Check the local marker
    #[inline]
    pub const fn is_local(self) -> bool {
        self.0 & Self::LOCAL != 0
    }

    /// Check the immutable marker
    #[inline]
    pub const fn is_immutable(self) -> bool {
        self.0 & Self::IMMUTABLE != 0
    }
}

/// One compiled function
///
/// `gc_constants` and `numeric_constants` are in logical (index) order.
/// A [`GcConstant::Child`]`(idx)` refers to `children[idx]`, and every child
/// is referenced exactly once. Decoding always numbers the references in
/// order (the k-th child constant is `Child(k)`); encoding accepts any
/// permutation and writes children in reference order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    /// Prototype flags
    pub flags: PrototypeFlags,
    /// Number of fixed parameters
    pub param_count: u8,
    /// Number of stack slots used
    pub frame_size: u8,
    /// Instructions in address order
    pub instructions: Vec<Instruction>,
    /// Upvalue descriptors
    pub upvalues: Vec<Upvalue>,
    /// GC constants
    pub gc_constants: Vec<GcConstant>,
    /// Numeric constants
    pub numeric_constants: Vec<NumericConstant>,
    /// Child prototypes, owned
    pub children: Vec<Prototype>,
}

impl Prototype {
    /// Create an empty prototype
    pub fn new() -> Self {
        Self::default()
    }

    /// Child referenced by a child constant
    pub fn child(&self, index: usize) -> Option<&Prototype> {
        self.children.get(index)
    }

    /// Number of child constants
    pub fn child_ref_count(&self) -> usize {
        self.gc_constants
            .iter()
            .filter(|k| matches!(k, GcConstant::Child(_)))
            .count()
    }

    /// Depth-first, pre-order iterator over this prototype and all descendants
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            pending: vec![self],
        }
    }

    /// Number of prototypes in this subtree, including this one
    pub fn tree_size(&self) -> usize {
        self.walk().count()
    }

    /// Decode one prototype body
    ///
    /// Child constants claim prototypes from `stack`. The decoded prototype
    /// is returned, not pushed; the caller decides where it goes.
    pub fn read_body(body: &mut ByteReader<'_>, stack: &mut ResolutionStack) -> Result<Self> {
        let start = body.offset();

        let flags = PrototypeFlags(body.read_u8()?);
        let param_count = body.read_u8()?;
        let frame_size = body.read_u8()?;
        let upvalue_count = usize::from(body.read_u8()?);
        let gc_count = body.read_uleb128()? as usize;
        let numeric_count = body.read_uleb128()? as usize;
        let instruction_count = body.read_uleb128()? as usize;

        let mut instructions = Vec::with_capacity(instruction_count.min(body.remaining() / 4));
        for _ in 0..instruction_count {
            instructions.push(Instruction::read(body)?);
        }
        let unknown = instructions.iter().filter(|i| i.info().is_unknown()).count();
        if unknown > 0 {
            tracing::warn!(
                "prototype at {} has {} instruction(s) with unknown opcodes",
                start,
                unknown
            );
        }
        if flags.unknown_bits() != 0 {
            tracing::warn!(
                "prototype at {} has unknown flag bits {:#x}",
                start,
                flags.unknown_bits()
            );
        }

        let mut upvalues = Vec::with_capacity(upvalue_count);
        for _ in 0..upvalue_count {
            upvalues.push(Upvalue(body.read_u16()?));
        }

        let mut claims = Claims {
            stack,
            claimed: Vec::new(),
        };
        let mut gc_constants = Vec::with_capacity(gc_count.min(body.remaining()));
        for _ in 0..gc_count {
            gc_constants.push(GcConstant::read(body, &mut claims)?);
        }

        // Wire order is last-declared-first, and children were claimed
        // most-recent-first: flip both and renumber the child references.
        let mut children = claims.claimed;
        children.reverse();
        gc_constants.reverse();
        let last = children.len().saturating_sub(1);
        for constant in &mut gc_constants {
            if let GcConstant::Child(idx) = constant {
                *idx = last - *idx;
            }
        }

        let mut numeric_constants = Vec::with_capacity(numeric_count.min(body.remaining()));
        for _ in 0..numeric_count {
            numeric_constants.push(NumericConstant::read(body)?);
        }

        if !body.is_empty() {
            return Err(DecodeError::BodyLength {
                offset: start,
                declared: body.position() + body.remaining(),
                consumed: body.position(),
            });
        }

        tracing::debug!(
            "decoded prototype at {}: {} instructions, {} upvalues, {} gc constants, {} numeric constants, {} children",
            start,
            instructions.len(),
            upvalues.len(),
            gc_constants.len(),
            numeric_constants.len(),
            children.len()
        );

        Ok(Self {
            flags,
            param_count,
            frame_size,
            instructions,
            upvalues,
            gc_constants,
            numeric_constants,
            children,
        })
    }

    /// Encode this prototype and its whole subtree
    ///
    /// Children are written first, in the order the child constants reference
    /// them, so the stream stays post-order and each reference claims the
    /// prototype it names. Each body is wrapped in its length prefix.
    pub fn write(&self, writer: &mut ByteWriter) {
        debug_assert!(
            self.child_refs_are_permutation(),
            "child constants must reference each child exactly once"
        );

        let referenced = self.gc_constants.iter().filter_map(|k| match k {
            GcConstant::Child(idx) => self.children.get(*idx),
            _ => None,
        });
        for child in referenced {
            child.write(writer);
        }

        let body = self.encode_body();
        writer.write_uleb128(body.len() as u32);
        writer.write_bytes(body.as_bytes());
    }

    fn child_refs_are_permutation(&self) -> bool {
        let mut seen = vec![false; self.children.len()];
        for constant in &self.gc_constants {
            if let GcConstant::Child(idx) = constant {
                match seen.get_mut(*idx) {
                    Some(slot) if !*slot => *slot = true,
                    _ => return false,
                }
            }
        }
        seen.into_iter().all(|slot| slot)
    }

    fn encode_body(&self) -> ByteWriter {
        let mut body = ByteWriter::new();
        body.write_u8(self.flags.0);
        body.write_u8(self.param_count);
        body.write_u8(self.frame_size);
        body.write_u8(self.upvalues.len() as u8);
        body.write_uleb128(self.gc_constants.len() as u32);
        body.write_uleb128(self.numeric_constants.len() as u32);
        body.write_uleb128(self.instructions.len() as u32);

        for instruction in &self.instructions {
            instruction.write(&mut body);
        }
        for upvalue in &self.upvalues {
            body.write_u16(upvalue.0);
        }
        for constant in self.gc_constants.iter().rev() {
            constant.write(&mut body);
        }
        for constant in &self.numeric_constants {
            constant.write(&mut body);
        }

        tracing::trace!(
            "encoded prototype body: {} bytes, {} children",
            body.len(),
            self.children.len()
        );
        body
    }
}

/// Pre-order traversal of a prototype tree
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    pending: Vec<&'a Prototype>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Prototype;

    fn next(&mut self) -> Option<Self::Item> {
        let proto = self.pending.pop()?;
        self.pending.extend(proto.children.iter().rev());
        Some(proto)
    }
}

/// Decoded prototypes not yet claimed by a parent
///
/// Scoped to a single container decode.
#[derive(Debug, Default)]
pub struct ResolutionStack {
    pending: Vec<Prototype>,
}

impl ResolutionStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unclaimed prototypes
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check whether nothing is pending
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Add a fully decoded prototype
    pub fn push(&mut self, proto: Prototype) {
        self.pending.push(proto);
    }

    /// Take the most recently pushed prototype
    pub fn pop(&mut self, offset: usize) -> Result<Prototype> {
        self.pending
            .pop()
            .ok_or(DecodeError::UnresolvedChild(ResolveFault::EmptyStack { offset }))
    }

    /// Take the root: exactly one prototype must be left
    pub fn finish(mut self) -> Result<Prototype> {
        match self.pending.len() {
            1 => self.pop(0),
            count => Err(DecodeError::UnresolvedChild(ResolveFault::Unclaimed { count })),
        }
    }
}

/// Claims children for one prototype, in claim order
struct Claims<'s> {
    stack: &'s mut ResolutionStack,
    claimed: Vec<Prototype>,
}

impl ChildResolver for Claims<'_> {
    fn claim(&mut self, offset: usize) -> Result<usize> {
        let child = self.stack.pop(offset)?;
        tracing::trace!("child constant at {} claimed a prototype", offset);
        self.claimed.push(child);
        Ok(self.claimed.len() - 1)
    }
}
