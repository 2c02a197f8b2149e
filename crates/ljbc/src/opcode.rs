//! Opcode table
//!
//! One entry per opcode byte, in opcode order. Each entry names the operand
//! slots the opcode uses and how each operand is interpreted. The same table
//! drives wire decoding (which slots to extract) and disassembly (how to
//! print them).

/// Interpretation of one instruction operand
///
/// Purely a display tag; it never changes how the operand is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// Variable slot
    Var,
    /// Base of a register range
    Base,
    /// Base of a register range, read-only
    RBase,
    /// Upvalue index
    Upvalue,
    /// Unsigned literal
    Lit,
    /// Signed literal
    SLit,
    /// Biased jump offset
    Jump,
    /// Numeric constant index
    Num,
    /// String constant index
    Str,
    /// Template table constant index
    Tab,
    /// Child prototype constant index
    Func,
    /// FFI cdata constant index
    CData,
    /// Primitive value code (nil/false/true)
    Pri,
}

impl OperandKind {
    /// Prefix printed before the operand value
    ///
    /// Jump offsets and primitives are rendered specially and have no prefix.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Var => "%",
            Self::Base | Self::RBase => "%%",
            Self::Upvalue => "^",
            Self::Num => "#",
            Self::Str | Self::Tab | Self::Func | Self::CData => "@",
            Self::Lit | Self::SLit | Self::Jump | Self::Pri => "",
        }
    }

    /// Short tag for this kind
    pub const fn name(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Base => "base",
            Self::RBase => "rbase",
            Self::Upvalue => "uv",
            Self::Lit => "lit",
            Self::SLit => "lits",
            Self::Jump => "jump",
            Self::Num => "num",
            Self::Str => "str",
            Self::Tab => "tab",
            Self::Func => "func",
            Self::CData => "cdata",
            Self::Pri => "pri",
        }
    }
}

/// Operand position inside an instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Bits 8..16
    A,
    /// Bits 24..32
    B,
    /// Bits 16..24
    C,
    /// Bits 16..32
    D,
}

/// Static description of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Upper-case mnemonic
    pub name: &'static str,
    /// Kind of operand A, if used
    pub a: Option<OperandKind>,
    /// Kind of operand B, if used
    pub b: Option<OperandKind>,
    /// Kind of operand C, if used
    pub c: Option<OperandKind>,
    /// Kind of operand D, if used
    pub d: Option<OperandKind>,
}

impl OpcodeInfo {
    /// Used slots with their kinds, in A, B, C, D order
    pub fn operands(&self) -> impl Iterator<Item = (Slot, OperandKind)> + '_ {
        [
            (Slot::A, self.a),
            (Slot::B, self.b),
            (Slot::C, self.c),
            (Slot::D, self.d),
        ]
        .into_iter()
        .filter_map(|(slot, kind)| kind.map(|kind| (slot, kind)))
    }

    /// Check whether this is the sentinel for opcodes outside the table
    pub fn is_unknown(&self) -> bool {
        std::ptr::eq(self, &UNKNOWN)
    }
}

const fn none(name: &'static str) -> OpcodeInfo {
    OpcodeInfo {
        name,
        a: None,
        b: None,
        c: None,
        d: None,
    }
}

const fn a(name: &'static str, a: OperandKind) -> OpcodeInfo {
    OpcodeInfo {
        a: Some(a),
        ..none(name)
    }
}

const fn d(name: &'static str, d: OperandKind) -> OpcodeInfo {
    OpcodeInfo {
        d: Some(d),
        ..none(name)
    }
}

const fn ad(name: &'static str, a: OperandKind, d: OperandKind) -> OpcodeInfo {
    OpcodeInfo {
        a: Some(a),
        d: Some(d),
        ..none(name)
    }
}

const fn abc(name: &'static str, a: OperandKind, b: OperandKind, c: OperandKind) -> OpcodeInfo {
    OpcodeInfo {
        a: Some(a),
        b: Some(b),
        c: Some(c),
        ..none(name)
    }
}

use OperandKind::*;

/// Sentinel entry for opcode bytes past the end of [`OPCODES`]
pub static UNKNOWN: OpcodeInfo = none("UNKNWN");

/// All known opcodes, indexed by opcode byte
pub static OPCODES: [OpcodeInfo; 97] = [
    // Comparison ops
    ad("ISLT", Var, Var),
    ad("ISGE", Var, Var),
    ad("ISLE", Var, Var),
    ad("ISGT", Var, Var),
    ad("ISEQV", Var, Var),
    ad("ISNEV", Var, Var),
    ad("ISEQS", Var, Str),
    ad("ISNES", Var, Str),
    ad("ISEQN", Var, Num),
    ad("ISNEN", Var, Num),
    ad("ISEQP", Var, Pri),
    ad("ISNEP", Var, Pri),
    // Unary test and copy ops
    ad("ISTC", Var, Var),
    ad("ISFC", Var, Var),
    d("IST", Var),
    d("ISF", Var),
    ad("ISTYPE", Var, Lit),
    ad("ISNUM", Var, Lit),
    // Unary ops
    ad("MOV", Var, Var),
    ad("NOT", Var, Var),
    ad("UNM", Var, Var),
    ad("LEN", Var, Var),
    // Binary ops
    abc("ADDVN", Var, Var, Num),
    abc("SUBVN", Var, Var, Num),
    abc("MULVN", Var, Var, Num),
    abc("DIVVN", Var, Var, Num),
    abc("MODVN", Var, Var, Num),
    abc("ADDNV", Var, Var, Num),
    abc("SUBNV", Var, Var, Num),
    abc("MULNV", Var, Var, Num),
    abc("DIVNV", Var, Var, Num),
    abc("MODNV", Var, Var, Num),
    abc("ADDVV", Var, Var, Var),
    abc("SUBVV", Var, Var, Var),
    abc("MULVV", Var, Var, Var),
    abc("DIVVV", Var, Var, Var),
    abc("MODVV", Var, Var, Var),
    abc("POW", Var, Var, Var),
    abc("CAT", Var, RBase, RBase),
    // Constant ops
    ad("KSTR", Var, Str),
    ad("KCDATA", Var, CData),
    ad("KSHORT", Var, SLit),
    ad("KNUM", Var, Num),
    ad("KPRI", Var, Pri),
    ad("KNIL", Base, Base),
    // Upvalue and function ops
    ad("UGET", Var, Upvalue),
    ad("USETV", Upvalue, Var),
    ad("USETS", Upvalue, Str),
    ad("USETN", Upvalue, Num),
    ad("USETP", Upvalue, Pri),
    ad("UCLO", RBase, Jump),
    ad("FNEW", Var, Func),
    // Table ops
    ad("TNEW", Var, Lit),
    ad("TDUP", Var, Tab),
    ad("GGET", Var, Str),
    ad("GSET", Var, Str),
    abc("TGETV", Var, Var, Var),
    abc("TGETS", Var, Var, Str),
    abc("TGETB", Var, Var, Lit),
    abc("TGETR", Var, Var, Var),
    abc("TSETV", Var, Var, Var),
    abc("TSETS", Var, Var, Str),
    abc("TSETB", Var, Var, Lit),
    ad("TSETM", Base, Num),
    abc("TSETR", Var, Var, Var),
    // Calls and vararg handling
    abc("CALLM", Base, Lit, Lit),
    abc("CALL", Base, Lit, Lit),
    ad("CALLMT", Base, Lit),
    ad("CALLT", Base, Lit),
    abc("ITERC", Base, Lit, Lit),
    abc("ITERN", Base, Lit, Lit),
    abc("VARG", Base, Lit, Lit),
    ad("ISNEXT", Base, Jump),
    // Returns
    ad("RETM", Base, Lit),
    ad("RET", RBase, Lit),
    ad("RET0", RBase, Lit),
    ad("RET1", RBase, Lit),
    // Loops and branches
    ad("FORI", Base, Jump),
    ad("JFORI", Base, Jump),
    ad("FORL", Base, Jump),
    ad("IFORL", Base, Jump),
    ad("JFORL", Base, Lit),
    ad("ITERL", Base, Jump),
    ad("IITERL", Base, Jump),
    ad("JITERL", Base, Lit),
    ad("LOOP", RBase, Jump),
    ad("ILOOP", RBase, Jump),
    ad("JLOOP", RBase, Lit),
    ad("JMP", RBase, Jump),
    // Function headers
    a("FUNCF", RBase),
    a("IFUNCF", RBase),
    ad("JFUNCF", RBase, Lit),
    a("FUNCV", RBase),
    a("IFUNCV", RBase),
    ad("JFUNCV", RBase, Lit),
    a("FUNCC", RBase),
    a("FUNCCW", RBase),
];

/// Look up an opcode byte, falling back to [`UNKNOWN`]
#[inline]
pub fn lookup(opcode: u8) -> &'static OpcodeInfo {
    OPCODES.get(usize::from(opcode)).unwrap_or(&UNKNOWN)
}

/// Find the opcode byte for a mnemonic (case-insensitive)
pub fn find(mnemonic: &str) -> Option<u8> {
    OPCODES
        .iter()
        .position(|info| info.name.eq_ignore_ascii_case(mnemonic))
        .and_then(|idx| u8::try_from(idx).ok())
}

#[cfg(test)]
mod tests {
    use super::OperandKind::*;
    use super::*;

    #[test]
    fn test_table_order() {
        assert_eq!(OPCODES[0].name, "ISLT");
        assert_eq!(find("RET0"), Some(75));
        assert_eq!(find("jmp"), Some(88));
        assert_eq!(OPCODES[96].name, "FUNCCW");
        assert_eq!(find("NOPE"), None);
    }

    #[test]
    fn test_unknown_opcode_is_sentinel() {
        let info = lookup(255);
        assert!(info.is_unknown());
        assert_eq!(info.name, "UNKNWN");
        assert_eq!(info.operands().count(), 0);
        assert!(!lookup(0).is_unknown());
    }

    #[test]
    fn test_operand_order() {
        let info = lookup(find("ADDVN").unwrap());
        let slots: Vec<_> = info.operands().collect();
        assert_eq!(
            slots,
            vec![(Slot::A, Var), (Slot::B, Var), (Slot::C, Num)]
        );

        let ist = lookup(find("IST").unwrap());
        assert_eq!(ist.operands().collect::<Vec<_>>(), vec![(Slot::D, Var)]);
    }

    #[test]
    fn test_no_entry_mixes_d_with_b_or_c() {
        for info in OPCODES.iter() {
            if info.d.is_some() {
                assert!(info.b.is_none() && info.c.is_none(), "{}", info.name);
            }
        }
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(Var.prefix(), "%");
        assert_eq!(RBase.prefix(), "%%");
        assert_eq!(Upvalue.prefix(), "^");
        assert_eq!(Num.prefix(), "#");
        assert_eq!(CData.prefix(), "@");
        assert_eq!(SLit.prefix(), "");
    }
}
