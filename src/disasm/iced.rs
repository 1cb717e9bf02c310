use crate::core::binary::{Arch, Endianness};
use crate::core::disassembler::{ArchMode, Disassembler, DisassemblerError, DisassemblerResult};
use crate::core::instruction::{Access, Instruction, Operand};

pub struct IcedDisassembler {
    bits: u32,
    arch: Arch,
    endianness: Endianness,
}

impl IcedDisassembler {
    pub fn new(arch: Arch, endianness: Endianness) -> Self {
        let bits = match arch {
            Arch::X86_16 => 16,
            Arch::X86 => 32,
            _ => 64,
        };
        Self {
            bits,
            arch,
            endianness,
        }
    }

    fn iced_operands(instr: &iced_x86::Instruction, bits: u32) -> Vec<Operand> {
        use iced_x86::{OpKind, Register as IReg};
        let mut out = Vec::new();
        for i in 0..instr.op_count() {
            match instr.op_kind(i) {
                OpKind::Register => {
                    let name = format!("{:?}", instr.op_register(i)).to_ascii_lowercase();
                    out.push(Operand::register(name, 0, Access::Read));
                }
                OpKind::Memory => {
                    let base = instr.memory_base();
                    let index = instr.memory_index();
                    let scale = instr.memory_index_scale();
                    let disp = instr.memory_displacement64() as i64;
                    let base_s = (base != IReg::None)
                        .then(|| format!("{:?}", base).to_ascii_lowercase());
                    let index_s =
                        (index != IReg::None).then(|| format!("{:?}", index).to_ascii_lowercase());
                    let scale_u8 = (scale > 0).then_some(scale as u8);
                    out.push(Operand::memory(
                        0,
                        Access::Read,
                        Some(disp),
                        base_s,
                        index_s,
                        scale_u8,
                    ));
                }
                OpKind::Immediate8 => {
                    out.push(Operand::immediate(instr.immediate8() as i8 as i64, 8))
                }
                OpKind::Immediate16 => {
                    out.push(Operand::immediate(instr.immediate16() as i16 as i64, 16))
                }
                OpKind::Immediate32 => {
                    out.push(Operand::immediate(instr.immediate32() as i32 as i64, 32))
                }
                OpKind::Immediate64 => out.push(Operand::immediate(instr.immediate64() as i64, 64)),
                OpKind::Immediate8to32 | OpKind::Immediate8to64 | OpKind::Immediate32to64 => {
                    out.push(Operand::immediate(instr.immediate(i) as i64, bits as u8))
                }
                OpKind::NearBranch16 | OpKind::NearBranch32 | OpKind::NearBranch64 => {
                    let target = instr.near_branch_target() as i64;
                    out.push(Operand::immediate(target, if bits >= 64 { 64 } else { 32 }));
                }
                // Segment is not modeled; the offset is the target.
                OpKind::FarBranch16 | OpKind::FarBranch32 => {
                    out.push(Operand::immediate(instr.far_branch32() as i64, 32));
                }
                _ => {}
            }
        }
        out
    }
}

impl Disassembler for IcedDisassembler {
    fn disassemble_instruction(
        &self,
        address: u64,
        bytes: &[u8],
    ) -> DisassemblerResult<Instruction> {
        use iced_x86::{Code, Decoder, DecoderError, DecoderOptions, Formatter, IntelFormatter};

        if !self.arch.is_x86() {
            return Err(DisassemblerError::UnsupportedArchitecture);
        }
        if bytes.is_empty() {
            return Err(DisassemblerError::InsufficientBytes);
        }
        let mut decoder = Decoder::with_ip(self.bits, bytes, address, DecoderOptions::NONE);
        let instr = decoder.decode();
        if instr.code() == Code::INVALID {
            return Err(match decoder.last_error() {
                DecoderError::NoMoreBytes => DisassemblerError::InsufficientBytes,
                _ => DisassemblerError::InvalidInstruction,
            });
        }
        let len = instr.len();
        let mut fmt = IntelFormatter::new();
        let mut out = String::new();
        fmt.format(&instr, &mut out);
        let (mnemonic, op_str) = match out.split_once(' ') {
            Some((m, rest)) => (m.to_string(), rest.trim().to_string()),
            None => (out.clone(), String::new()),
        };

        Ok(Instruction {
            address,
            bytes: bytes[..len.min(bytes.len())].to_vec(),
            mnemonic,
            op_str,
            operands: Self::iced_operands(&instr, self.bits),
            length: len as u16,
        })
    }

    fn max_instruction_length(&self) -> usize {
        15
    }

    fn architecture(&self) -> Arch {
        self.arch
    }

    fn endianness(&self) -> Endianness {
        self.endianness
    }

    fn mode(&self) -> ArchMode {
        match self.bits {
            16 => ArchMode::X86_16,
            32 => ArchMode::X86_32,
            _ => ArchMode::X86_64,
        }
    }

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()> {
        self.bits = match mode {
            ArchMode::X86_16 => 16,
            ArchMode::X86_32 => 32,
            ArchMode::X86_64 => 64,
            other => return Err(DisassemblerError::UnsupportedMode(other)),
        };
        Ok(())
    }

    fn name(&self) -> &str {
        "iced-x86"
    }
}
