//! Disassembler trait and error types for instruction decoding.
//!
//! This module defines the Disassembler trait that provides a common interface
//! for the disassembly engines (iced-x86, Capstone). It also includes the
//! engine sub-mode type used to switch encodings (ARM/Thumb, x86 widths).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::core::binary::{Arch, Endianness};
use crate::core::instruction::Instruction;

/// Errors that can occur during disassembly operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DisassemblerError {
    /// Invalid instruction bytes
    #[error("InvalidInstruction")]
    InvalidInstruction,
    /// Insufficient bytes for complete instruction
    #[error("InsufficientBytes")]
    InsufficientBytes,
    /// Unsupported architecture for the selected backend
    #[error("UnsupportedArchitecture")]
    UnsupportedArchitecture,
    /// The engine cannot switch to the requested sub-mode
    #[error("UnsupportedMode: {0}")]
    UnsupportedMode(ArchMode),
    /// Internal disassembler error with message
    #[error("InternalError: {0}")]
    InternalError(String),
}

/// Result type for disassembly operations
pub type DisassemblerResult<T> = Result<T, DisassemblerError>;

/// Instruction-set sub-mode of a disassembly engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchMode {
    /// Not known when the jump target was created; the decoder uses the
    /// translator's current mode.
    Unknown,
    X86_16,
    X86_32,
    X86_64,
    Arm,
    Thumb,
    Arm64,
    Mips32,
    Mips64,
    Ppc32,
    Ppc64,
    Riscv32,
    Riscv64,
}

impl ArchMode {
    /// The mode an engine for `arch` starts in.
    pub fn basic_for(arch: Arch) -> ArchMode {
        match arch {
            Arch::X86_16 => ArchMode::X86_16,
            Arch::X86 => ArchMode::X86_32,
            Arch::X86_64 => ArchMode::X86_64,
            Arch::ARM => ArchMode::Arm,
            Arch::AArch64 => ArchMode::Arm64,
            Arch::MIPS => ArchMode::Mips32,
            Arch::MIPS64 => ArchMode::Mips64,
            Arch::PPC => ArchMode::Ppc32,
            Arch::PPC64 => ArchMode::Ppc64,
            Arch::RISCV => ArchMode::Riscv32,
            Arch::RISCV64 => ArchMode::Riscv64,
            Arch::Unknown => ArchMode::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ArchMode::Unknown)
    }
}

impl fmt::Display for ArchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Core disassembler trait that provides a common interface for instruction decoding
pub trait Disassembler {
    /// Disassemble a single instruction at the given address
    ///
    /// # Arguments
    /// * `address` - The virtual address where the instruction is located
    /// * `bytes` - The raw bytes to disassemble, starting at `address`
    fn disassemble_instruction(&self, address: u64, bytes: &[u8])
        -> DisassemblerResult<Instruction>;

    /// Get the maximum instruction length for this architecture in bytes
    fn max_instruction_length(&self) -> usize;

    fn architecture(&self) -> Arch;

    fn endianness(&self) -> Endianness;

    /// Current engine sub-mode
    fn mode(&self) -> ArchMode;

    /// Switch the engine sub-mode. Engines only accept modes of their own
    /// architecture family.
    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()>;

    /// Get a human-readable name for this disassembler
    fn name(&self) -> &str {
        "Generic Disassembler"
    }
}
