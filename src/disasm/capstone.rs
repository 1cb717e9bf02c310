use crate::core::binary::{Arch as BArch, Endianness};
use crate::core::disassembler::{ArchMode, Disassembler, DisassemblerError, DisassemblerResult};
use crate::core::instruction::{Access, Instruction, Operand};
use capstone::arch::arm::ArmOperandType;
use capstone::arch::arm64::Arm64OperandType;
use capstone::prelude::*;
use capstone::{Arch, Capstone, Endian, Mode, NO_EXTRA_MODE};

pub struct CapstoneDisassembler {
    cs: capstone::Capstone,
    arch: BArch,
    endianness: Endianness,
    mode: ArchMode,
}

fn cs_endian(end: Endianness) -> Endian {
    if matches!(end, Endianness::Big) {
        Endian::Big
    } else {
        Endian::Little
    }
}

fn cs_arch_mode(arch: BArch, end: Endianness) -> Option<(Arch, Mode, Option<Endian>)> {
    match arch {
        BArch::ARM => Some((Arch::ARM, Mode::Arm, Some(cs_endian(end)))),
        BArch::AArch64 => Some((Arch::ARM64, Mode::Arm, Some(cs_endian(end)))),
        BArch::MIPS => Some((Arch::MIPS, Mode::Mips32, Some(cs_endian(end)))),
        BArch::MIPS64 => Some((Arch::MIPS, Mode::Mips64, Some(cs_endian(end)))),
        BArch::PPC => Some((Arch::PPC, Mode::Mode32, Some(cs_endian(end)))),
        BArch::PPC64 => Some((Arch::PPC, Mode::Mode64, Some(cs_endian(end)))),
        BArch::RISCV => Some((Arch::RISCV, Mode::RiscV32, None)),
        BArch::RISCV64 => Some((Arch::RISCV, Mode::RiscV64, None)),
        BArch::X86_16 | BArch::X86 | BArch::X86_64 | BArch::Unknown => None,
    }
}

/// Engine mode for a sub-mode, restricted to the engine's own family.
fn cs_mode_for(arch: BArch, mode: ArchMode) -> Option<Mode> {
    match (arch, mode) {
        (BArch::ARM, ArchMode::Arm) => Some(Mode::Arm),
        (BArch::ARM, ArchMode::Thumb) => Some(Mode::Thumb),
        (BArch::AArch64, ArchMode::Arm64) => Some(Mode::Arm),
        (BArch::MIPS | BArch::MIPS64, ArchMode::Mips32) => Some(Mode::Mips32),
        (BArch::MIPS | BArch::MIPS64, ArchMode::Mips64) => Some(Mode::Mips64),
        (BArch::PPC | BArch::PPC64, ArchMode::Ppc32) => Some(Mode::Mode32),
        (BArch::PPC | BArch::PPC64, ArchMode::Ppc64) => Some(Mode::Mode64),
        (BArch::RISCV | BArch::RISCV64, ArchMode::Riscv32) => Some(Mode::RiscV32),
        (BArch::RISCV | BArch::RISCV64, ArchMode::Riscv64) => Some(Mode::RiscV64),
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start_matches('#');
    let (neg, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let v = match s.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => s.parse::<i64>().ok()?,
    };
    Some(if neg { -v } else { v })
}

impl CapstoneDisassembler {
    pub fn new(arch: BArch, endianness: Endianness) -> Option<Self> {
        let (a, m, endian) = cs_arch_mode(arch, endianness)?;
        let mut cs = Capstone::new_raw(a, m, NO_EXTRA_MODE, endian).ok()?;
        // Details recover structured operands (PC-relative branch targets)
        let _ = cs.set_detail(true);
        Some(Self {
            cs,
            arch,
            endianness,
            mode: ArchMode::basic_for(arch),
        })
    }

    fn parse_operands_simple(op_str: &str) -> Vec<Operand> {
        let mut out = Vec::new();
        for tok in op_str
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
        {
            let lower = tok.to_ascii_lowercase();
            // Bracket form: [base, #disp] (ARM/ARM64)
            if let (Some(l), Some(r)) = (lower.find('['), lower.find(']')) {
                let inside = &lower[(l + 1)..r];
                let mut base: Option<String> = None;
                let mut disp: Option<i64> = None;
                for part in inside.split(',').map(|p| p.trim()).filter(|p| !p.is_empty()) {
                    if base.is_none() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        base = Some(part.to_string());
                    } else if let Some(v) = parse_int(part) {
                        disp = Some(v);
                    }
                }
                out.push(Operand::memory(0, Access::Read, disp, base, None, None));
                continue;
            }
            // Paren form: disp(base) (MIPS/RISCV/PPC)
            if let (Some(l), Some(r)) = (lower.find('('), lower.find(')')) {
                let inside = lower[(l + 1)..r].trim();
                let base = (!inside.is_empty()).then(|| inside.to_string());
                let disp = parse_int(lower[..l].trim());
                out.push(Operand::memory(0, Access::Read, disp, base, None, None));
                continue;
            }
            // Registers such as `a0` on RISC-V look hexadecimal; immediates
            // must start with a digit, '#' or '-'.
            let looks_imm = lower
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || c == '#' || c == '-');
            match parse_int(&lower).filter(|_| looks_imm) {
                Some(v) => out.push(Operand::immediate(v, 0)),
                None => out.push(Operand::register(tok.to_string(), 0, Access::Read)),
            }
        }
        out
    }

    fn detailed_operands(&self, insn: &capstone::Insn) -> Vec<Operand> {
        let mut operands = Vec::new();
        let Ok(detail) = self.cs.insn_detail(insn) else {
            return operands;
        };
        let reg_name = |r: RegId| self.cs.reg_name(r).unwrap_or_default();
        match self.arch {
            BArch::AArch64 => {
                if let Some(ad) = detail.arch_detail().arm64() {
                    for op in ad.operands() {
                        match op.op_type {
                            Arm64OperandType::Reg(r) => {
                                operands.push(Operand::register(reg_name(r), 0, Access::Read))
                            }
                            Arm64OperandType::Imm(i) => operands.push(Operand::immediate(i, 0)),
                            Arm64OperandType::Mem(m) => {
                                let base = (m.base().0 != 0).then(|| reg_name(m.base()));
                                let index = (m.index().0 != 0).then(|| reg_name(m.index()));
                                operands.push(Operand::memory(
                                    0,
                                    Access::Read,
                                    Some(m.disp() as i64),
                                    base,
                                    index,
                                    None,
                                ));
                            }
                            _ => {}
                        }
                    }
                }
            }
            BArch::ARM => {
                if let Some(ad) = detail.arch_detail().arm() {
                    for op in ad.operands() {
                        match op.op_type {
                            ArmOperandType::Reg(r) => {
                                operands.push(Operand::register(reg_name(r), 0, Access::Read))
                            }
                            ArmOperandType::Imm(i) => {
                                operands.push(Operand::immediate(i as u32 as i64, 0))
                            }
                            ArmOperandType::Mem(m) => {
                                let base = (m.base().0 != 0).then(|| reg_name(m.base()));
                                let index = (m.index().0 != 0).then(|| reg_name(m.index()));
                                operands.push(Operand::memory(
                                    0,
                                    Access::Read,
                                    Some(m.disp() as i64),
                                    base,
                                    index,
                                    None,
                                ));
                            }
                            _ => {}
                        }
                    }
                }
            }
            // Other arches rely on the textual fallback.
            _ => {}
        }
        operands
    }
}

impl Disassembler for CapstoneDisassembler {
    fn disassemble_instruction(
        &self,
        address: u64,
        bytes: &[u8],
    ) -> DisassemblerResult<Instruction> {
        if bytes.is_empty() {
            return Err(DisassemblerError::InsufficientBytes);
        }
        let insns = self
            .cs
            .disasm_count(bytes, address, 1)
            .map_err(|e| DisassemblerError::InternalError(e.to_string()))?;
        let insn = insns
            .iter()
            .next()
            .ok_or(DisassemblerError::InvalidInstruction)?;
        let len = insn.bytes().len();
        let op_str = insn.op_str().unwrap_or("").to_string();
        let mut operands = self.detailed_operands(insn);
        if operands.is_empty() && !op_str.is_empty() {
            operands = Self::parse_operands_simple(&op_str);
        }
        Ok(Instruction {
            address,
            bytes: insn.bytes().to_vec(),
            mnemonic: insn.mnemonic().unwrap_or("").to_string(),
            op_str,
            operands,
            length: len as u16,
        })
    }

    fn max_instruction_length(&self) -> usize {
        8
    }
    fn architecture(&self) -> BArch {
        self.arch
    }
    fn endianness(&self) -> Endianness {
        self.endianness
    }
    fn mode(&self) -> ArchMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()> {
        if mode == self.mode {
            return Ok(());
        }
        let cs_mode = cs_mode_for(self.arch, mode).ok_or(DisassemblerError::UnsupportedMode(mode))?;
        self.cs
            .set_mode(cs_mode)
            .map_err(|e| DisassemblerError::InternalError(e.to_string()))?;
        self.mode = mode;
        Ok(())
    }

    fn name(&self) -> &str {
        "capstone"
    }
}
