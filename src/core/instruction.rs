//! Instruction and Operand types for decoded machine instructions.
//!
//! These are what a disassembly engine reports for one instruction. The
//! translator layer turns them into IR; nothing here knows about blocks
//! or functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Types of operands that can appear in instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    /// Register operand
    Register,
    /// Immediate value operand (including resolved branch targets)
    Immediate,
    /// Memory reference operand
    Memory,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandKind::Register => write!(f, "Register"),
            OperandKind::Immediate => write!(f, "Immediate"),
            OperandKind::Memory => write!(f, "Memory"),
        }
    }
}

/// Access types for operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

/// Structured operand representation for instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub kind: OperandKind,
    /// Size in bits (0 when the engine does not report it)
    pub size: u8,
    pub access: Access,
    /// String representation of the operand (fallback)
    pub text: String,
    pub register: Option<String>,
    pub immediate: Option<i64>,
    pub displacement: Option<i64>,
    pub base: Option<String>,
    pub index: Option<String>,
    pub scale: Option<u8>,
}

impl Operand {
    pub fn register(name: String, size: u8, access: Access) -> Self {
        Self {
            kind: OperandKind::Register,
            size,
            access,
            text: name.clone(),
            register: Some(name),
            immediate: None,
            displacement: None,
            base: None,
            index: None,
            scale: None,
        }
    }

    pub fn immediate(value: i64, size: u8) -> Self {
        Self {
            kind: OperandKind::Immediate,
            size,
            access: Access::Read,
            text: format!("0x{:x}", value),
            register: None,
            immediate: Some(value),
            displacement: None,
            base: None,
            index: None,
            scale: None,
        }
    }

    pub fn memory(
        size: u8,
        access: Access,
        displacement: Option<i64>,
        base: Option<String>,
        index: Option<String>,
        scale: Option<u8>,
    ) -> Self {
        let mut text = String::from("[");
        if let Some(base) = &base {
            text.push_str(base);
        }
        if let Some(index) = &index {
            if base.is_some() {
                text.push_str(" + ");
            }
            text.push_str(index);
            if let Some(scale) = scale.filter(|s| *s > 1) {
                text.push_str(&format!(" * {}", scale));
            }
        }
        if let Some(disp) = displacement {
            if base.is_some() || index.is_some() {
                if disp >= 0 {
                    text.push_str(&format!(" + 0x{:x}", disp));
                } else {
                    text.push_str(&format!(" - 0x{:x}", disp.unsigned_abs()));
                }
            } else {
                text.push_str(&format!("0x{:x}", disp));
            }
        }
        text.push(']');

        Self {
            kind: OperandKind::Memory,
            size,
            access,
            text,
            register: None,
            immediate: None,
            displacement,
            base,
            index,
            scale,
        }
    }

    pub fn is_register(&self) -> bool {
        self.kind == OperandKind::Register
    }

    pub fn is_immediate(&self) -> bool {
        self.kind == OperandKind::Immediate
    }

    pub fn is_memory(&self) -> bool {
        self.kind == OperandKind::Memory
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Decoded instruction at a specific address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Virtual address of the first byte
    pub address: u64,
    /// Raw bytes of the instruction
    pub bytes: Vec<u8>,
    /// Instruction mnemonic (e.g., "mov", "add", "jmp")
    pub mnemonic: String,
    /// Operand text as printed by the engine
    pub op_str: String,
    /// Structured operands
    pub operands: Vec<Operand>,
    /// Length of the instruction in bytes
    pub length: u16,
}

impl Instruction {
    pub fn end_address(&self) -> u64 {
        self.address.wrapping_add(self.length as u64)
    }

    /// First immediate operand, the shape engines use for direct
    /// branch/call targets.
    pub fn immediate_target(&self) -> Option<u64> {
        self.operands
            .iter()
            .filter(|op| op.is_immediate())
            .find_map(|op| op.immediate)
            .map(|v| v as u64)
    }

    /// Last immediate operand. Compare-and-branch forms (`cbz x0, #t`,
    /// `beq a0, a1, t`) carry the target last.
    pub fn last_immediate(&self) -> Option<u64> {
        self.operands
            .iter()
            .rev()
            .filter(|op| op.is_immediate())
            .find_map(|op| op.immediate)
            .map(|v| v as u64)
    }

    /// Register operands in order
    pub fn registers(&self) -> impl Iterator<Item = &str> {
        self.operands.iter().filter_map(|op| op.register.as_deref())
    }

    pub fn disassembly(&self) -> String {
        if self.op_str.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{} {}", self.mnemonic, self.op_str)
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}: {}", self.address, self.disassembly())
    }
}
