//! Architecture and byte-order descriptors for the image being lifted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The CPU architecture of a binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    /// 16-bit x86 (real mode)
    X86_16,
    /// 32-bit x86
    X86,
    /// 64-bit x86
    X86_64,
    /// 32-bit ARM (with Thumb interworking)
    ARM,
    /// 64-bit ARM
    AArch64,
    /// MIPS (32-bit)
    MIPS,
    /// MIPS (64-bit)
    MIPS64,
    /// PowerPC (32-bit)
    PPC,
    /// PowerPC (64-bit)
    PPC64,
    /// RISC-V (32-bit)
    RISCV,
    /// RISC-V (64-bit)
    RISCV64,
    /// Unknown or unsupported architecture
    Unknown,
}

impl Arch {
    pub fn is_64_bit(&self) -> bool {
        matches!(
            self,
            Arch::X86_64 | Arch::AArch64 | Arch::MIPS64 | Arch::PPC64 | Arch::RISCV64
        )
    }

    pub fn bits(&self) -> u8 {
        match self {
            Arch::X86_16 => 16,
            a if a.is_64_bit() => 64,
            _ => 32,
        }
    }

    /// True for architectures that interleave two encodings selected by
    /// the low address bit.
    pub fn is_arm_or_thumb(&self) -> bool {
        matches!(self, Arch::ARM)
    }

    pub fn is_x86(&self) -> bool {
        matches!(self, Arch::X86_16 | Arch::X86 | Arch::X86_64)
    }

    /// Default byte order by architecture family.
    pub fn default_endianness(&self) -> Endianness {
        match self {
            Arch::PPC | Arch::PPC64 => Endianness::Big,
            _ => Endianness::Little,
        }
    }
}

impl From<object::Architecture> for Arch {
    fn from(a: object::Architecture) -> Self {
        match a {
            object::Architecture::I386 => Arch::X86,
            object::Architecture::X86_64 => Arch::X86_64,
            object::Architecture::Arm => Arch::ARM,
            object::Architecture::Aarch64 => Arch::AArch64,
            object::Architecture::Mips => Arch::MIPS,
            object::Architecture::Mips64 => Arch::MIPS64,
            object::Architecture::PowerPc => Arch::PPC,
            object::Architecture::PowerPc64 => Arch::PPC64,
            object::Architecture::Riscv32 => Arch::RISCV,
            object::Architecture::Riscv64 => Arch::RISCV64,
            _ => Arch::Unknown,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Arch::X86_16 => "x86_16",
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::ARM => "arm",
            Arch::AArch64 => "aarch64",
            Arch::MIPS => "mips",
            Arch::MIPS64 => "mips64",
            Arch::PPC => "ppc",
            Arch::PPC64 => "ppc64",
            Arch::RISCV => "riscv",
            Arch::RISCV64 => "riscv64",
            Arch::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    /// Little-endian byte order
    Little,
    /// Big-endian byte order
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "Little"),
            Endianness::Big => write!(f, "Big"),
        }
    }
}
