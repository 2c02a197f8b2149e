//! Human-readable listing of a decoded container
//!
//! The listing is for reading only; it is not parsed back.

use std::fmt::{self, Write as _};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::constant::{ConstantTable, ConstantTableValue, GcConstant, NumericConstant};
use crate::container::Container;
use crate::flags::FlagSet;
use crate::instruction::{Instruction, JUMP_BIAS};
use crate::numeric::sign_extend;
use crate::opcode::{OperandKind, Slot};
use crate::prototype::Prototype;
use crate::text::quote_bytes;

/// Listing options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisasmOptions {
    /// Spaces per nesting level
    pub indent_width: usize,
    /// Mark instructions that some jump lands on with `=>`
    pub mark_jump_targets: bool,
    /// Print version and prototype count above the flags
    pub show_header: bool,
}

impl Default for DisasmOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            mark_jump_targets: true,
            show_header: true,
        }
    }
}

/// Renders containers and prototypes as text
#[derive(Debug, Clone, Default)]
pub struct Disassembler {
    options: DisasmOptions,
}

impl Disassembler {
    /// Create a disassembler with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a disassembler with the given options
    pub fn with_options(options: DisasmOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &DisasmOptions {
        &self.options
    }

    /// Render a whole container
    pub fn disassemble(&self, container: &Container) -> String {
        Listing {
            disasm: self,
            item: Item::Container(container),
        }
        .to_string()
    }

    /// Render one prototype and its children
    pub fn disassemble_prototype(&self, proto: &Prototype) -> String {
        Listing {
            disasm: self,
            item: Item::Prototype(proto),
        }
        .to_string()
    }

    fn pad(&self, depth: usize) -> String {
        " ".repeat(depth * self.options.indent_width)
    }

    fn write_container(&self, f: &mut fmt::Formatter<'_>, container: &Container) -> fmt::Result {
        if self.options.show_header {
            writeln!(f, "; version: {}", container.version)?;
            writeln!(f, "; prototypes: {}", container.root.tree_size())?;
        }
        write_flags(f, "", &container.flags)?;
        if container.flags.names().is_empty() {
            writeln!(f, "; flags: none")?;
        }
        writeln!(f)?;
        self.write_prototype(f, &container.root, 0)
    }

    /// The header line is written without indentation so a child can be
    /// rendered inline after its constant index.
    fn write_prototype(&self, f: &mut fmt::Formatter<'_>, proto: &Prototype, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "function({} params, frame {})",
            proto.param_count, proto.frame_size
        )?;
        let pad = self.pad(depth + 1);
        write_flags(f, &pad, &proto.flags)?;

        if !proto.gc_constants.is_empty() {
            writeln!(f, "{pad}; gc constants:")?;
            for (idx, constant) in proto.gc_constants.iter().enumerate() {
                write!(f, "{pad};   @{idx} = ")?;
                match constant {
                    GcConstant::Child(child) => match proto.child(*child) {
                        Some(child) => self.write_prototype(f, child, depth + 2)?,
                        None => writeln!(f, "<missing child {child}>")?,
                    },
                    other => writeln!(f, "{}", format_gc_constant(other))?,
                }
            }
        }

        if !proto.numeric_constants.is_empty() {
            writeln!(f, "{pad}; numeric constants:")?;
            for (idx, constant) in proto.numeric_constants.iter().enumerate() {
                writeln!(f, "{pad};   #{idx} = {}", format_numeric(constant))?;
            }
        }

        if !proto.upvalues.is_empty() {
            writeln!(f, "{pad}; upvalues:")?;
            for (idx, upvalue) in proto.upvalues.iter().enumerate() {
                write!(f, "{pad};   ^{idx} = slot {}", upvalue.slot())?;
                if upvalue.is_local() {
                    f.write_str(" local")?;
                }
                if upvalue.is_immutable() {
                    f.write_str(" readonly")?;
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "{pad}; code:")?;
        let targets = if self.options.mark_jump_targets {
            jump_targets(&proto.instructions)
        } else {
            FxHashSet::default()
        };
        for (pc, insn) in proto.instructions.iter().enumerate() {
            let mut line = format!("{pad}{pc:04}  ");
            if self.options.mark_jump_targets {
                line.push_str(if targets.contains(&pc) { "=> " } else { "   " });
            }
            line.push_str(&format_instruction(insn));
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

enum Item<'a> {
    Container(&'a Container),
    Prototype(&'a Prototype),
}

struct Listing<'a> {
    disasm: &'a Disassembler,
    item: Item<'a>,
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.item {
            Item::Container(container) => self.disasm.write_container(f, container),
            Item::Prototype(proto) => self.disasm.write_prototype(f, proto, 0),
        }
    }
}

fn write_flags(f: &mut fmt::Formatter<'_>, pad: &str, flags: &impl FlagSet) -> fmt::Result {
    for name in flags.names() {
        writeln!(f, "{pad}; flags: {name}")?;
    }
    Ok(())
}

/// Addresses that some jump operand in `code` lands on
fn jump_targets(code: &[Instruction]) -> FxHashSet<usize> {
    code.iter()
        .enumerate()
        .filter_map(|(pc, insn)| insn.jump_target(pc))
        .filter_map(|target| usize::try_from(target).ok())
        .filter(|&target| target < code.len())
        .collect()
}

/// Render one instruction: lowercase mnemonic, then its operands
///
/// ```
/// use ljbc::{disasm::format_instruction, opcode, Instruction};
///
/// let ret0 = Instruction::new(opcode::find("RET0").unwrap()).with_a(0).with_d(1);
/// assert_eq!(format_instruction(&ret0), "ret0   %%0, 1");
/// ```
pub fn format_instruction(insn: &Instruction) -> String {
    let info = insn.info();
    let operands: Vec<String> = info
        .operands()
        .filter_map(|(slot, kind)| insn.operand(slot).map(|raw| format_operand(kind, slot, raw)))
        .collect();
    let mnemonic = info.name.to_ascii_lowercase();
    format!("{mnemonic:<6} {}", operands.join(", "))
        .trim_end()
        .to_string()
}

/// Render one operand value according to its kind
pub fn format_operand(kind: OperandKind, slot: Slot, raw: u16) -> String {
    match kind {
        OperandKind::Pri => match raw {
            0 => "nil",
            1 => "false",
            2 => "true",
            _ => "!nil",
        }
        .to_string(),
        OperandKind::Jump => {
            let delta = i32::from(raw) - JUMP_BIAS;
            if delta > 0 {
                format!("+{delta}")
            } else {
                delta.to_string()
            }
        }
        OperandKind::SLit => {
            let width = if slot == Slot::D { 2 } else { 1 };
            sign_extend(raw.into(), width).to_string()
        }
        _ => format!("{}{raw}", kind.prefix()),
    }
}

/// Render a numeric constant
pub fn format_numeric(constant: &NumericConstant) -> String {
    match constant {
        NumericConstant::Int32(value) => value.to_string(),
        NumericConstant::Float64(value) => format!("{value:?}"),
    }
}

/// Render a GC constant other than a child reference
pub fn format_gc_constant(constant: &GcConstant) -> String {
    match constant {
        GcConstant::Child(idx) => format!("<child {idx}>"),
        GcConstant::Table(table) => format_table(table),
        GcConstant::Int64(value) => format!("{value}LL"),
        GcConstant::UInt64(value) => format!("{value}ULL"),
        GcConstant::Complex(re, im) => {
            let sign = if im.is_sign_negative() { '-' } else { '+' };
            format!("{re:?}{sign}{:?}i", im.abs())
        }
        GcConstant::Bytes(bytes) => quote_bytes(bytes),
    }
}

/// Render a template table as `{ [k]=v, ... }`
pub fn format_table(table: &ConstantTable) -> String {
    if table.is_empty() {
        return "{}".to_string();
    }
    let mut out = String::from("{ ");
    let entries = table
        .array
        .iter()
        .enumerate()
        .map(|(idx, value)| (idx.to_string(), value))
        .chain(
            table
                .hash
                .iter()
                .map(|(key, value)| (format_table_value(key), value)),
        );
    for (n, (key, value)) in entries.enumerate() {
        if n > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "[{key}]={}", format_table_value(value));
    }
    out.push_str(" }");
    out
}

fn format_table_value(value: &ConstantTableValue) -> String {
    match value {
        ConstantTableValue::Nil => "nil".to_string(),
        ConstantTableValue::False => "false".to_string(),
        ConstantTableValue::True => "true".to_string(),
        ConstantTableValue::Int32(value) => value.to_string(),
        ConstantTableValue::Int64(value) => format!("{value}LL"),
        ConstantTableValue::Bytes(bytes) => quote_bytes(bytes),
    }
}
