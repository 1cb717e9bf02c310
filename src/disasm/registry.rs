use crate::core::binary::{Arch, Endianness};
use crate::core::disassembler::{ArchMode, Disassembler, DisassemblerError, DisassemblerResult};
use crate::core::instruction::Instruction;

pub enum Backend {
    Iced(super::iced::IcedDisassembler),
    Cap(super::capstone::CapstoneDisassembler),
}

impl Disassembler for Backend {
    fn disassemble_instruction(
        &self,
        address: u64,
        bytes: &[u8],
    ) -> DisassemblerResult<Instruction> {
        match self {
            Backend::Iced(d) => d.disassemble_instruction(address, bytes),
            Backend::Cap(d) => d.disassemble_instruction(address, bytes),
        }
    }

    fn max_instruction_length(&self) -> usize {
        match self {
            Backend::Iced(d) => d.max_instruction_length(),
            Backend::Cap(d) => d.max_instruction_length(),
        }
    }

    fn architecture(&self) -> Arch {
        match self {
            Backend::Iced(d) => d.architecture(),
            Backend::Cap(d) => d.architecture(),
        }
    }

    fn endianness(&self) -> Endianness {
        match self {
            Backend::Iced(d) => d.endianness(),
            Backend::Cap(d) => d.endianness(),
        }
    }

    fn mode(&self) -> ArchMode {
        match self {
            Backend::Iced(d) => d.mode(),
            Backend::Cap(d) => d.mode(),
        }
    }

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()> {
        match self {
            Backend::Iced(d) => d.set_mode(mode),
            Backend::Cap(d) => d.set_mode(mode),
        }
    }

    fn name(&self) -> &str {
        match self {
            Backend::Iced(d) => d.name(),
            Backend::Cap(d) => d.name(),
        }
    }
}

/// Select a disassembler backend for the given architecture.
pub fn for_arch(arch: Arch, endianness: Endianness) -> Option<Backend> {
    match arch {
        Arch::X86_16 | Arch::X86 | Arch::X86_64 => Some(Backend::Iced(
            super::iced::IcedDisassembler::new(arch, endianness),
        )),
        Arch::ARM
        | Arch::AArch64
        | Arch::MIPS
        | Arch::MIPS64
        | Arch::PPC
        | Arch::PPC64
        | Arch::RISCV
        | Arch::RISCV64 => {
            super::capstone::CapstoneDisassembler::new(arch, endianness).map(Backend::Cap)
        }
        Arch::Unknown => None,
    }
}

/// Preferred backend kind for explicit selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Iced,
    Capstone,
}

/// Explicit backend selector. Returns an error if the backend cannot support the arch.
pub fn for_arch_with(
    arch: Arch,
    endianness: Endianness,
    prefer: Option<BackendKind>,
) -> Result<Backend, DisassemblerError> {
    match prefer {
        Some(BackendKind::Iced) if arch.is_x86() => Ok(Backend::Iced(
            super::iced::IcedDisassembler::new(arch, endianness),
        )),
        Some(BackendKind::Iced) => Err(DisassemblerError::UnsupportedArchitecture),
        Some(BackendKind::Capstone) => super::capstone::CapstoneDisassembler::new(arch, endianness)
            .map(Backend::Cap)
            .ok_or(DisassemblerError::UnsupportedArchitecture),
        None => for_arch(arch, endianness).ok_or(DisassemblerError::UnsupportedArchitecture),
    }
}
