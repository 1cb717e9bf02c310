//! Disassembly engines and registry.
//!
//! Always-on adapters:
//! - iced-x86 for x86 (16/32/64-bit)
//! - capstone for ARM/Thumb, AArch64, MIPS, PPC and RISC-V

pub mod capstone;
pub mod iced;
pub mod registry;
