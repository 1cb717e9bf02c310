//! Translator backed by a disassembly engine.
//!
//! Semantics are not modelled beyond the machine-instruction marker, the
//! x87 register-stack helpers and the control-transfer placeholder.

use tracing::trace;

use super::{classify_flow, InstructionTranslator, TranslationResult, X87Features};
use crate::core::binary::{Arch, Endianness};
use crate::core::disassembler::{ArchMode, Disassembler, DisassemblerResult};
use crate::core::instruction::Instruction;
use crate::disasm::registry::{self, Backend};
use crate::error::{LiftError, Result};
use crate::ir::{FlowKind, IrBuilder, Value};

pub struct DisasmTranslator<D = Backend> {
    disasm: D,
    basic_mode: ArchMode,
    x87: Option<X87Features>,
}

impl DisasmTranslator<Backend> {
    /// Translator over the registry's default engine for `arch`.
    pub fn for_arch(arch: Arch, endianness: Endianness) -> Result<Self> {
        let backend = registry::for_arch(arch, endianness).ok_or_else(|| LiftError::Translator {
            arch: arch.to_string(),
            message: "no disassembly engine for this architecture".to_string(),
        })?;
        Ok(Self::new(backend))
    }
}

impl<D: Disassembler> DisasmTranslator<D> {
    pub fn new(disasm: D) -> Self {
        let basic_mode = disasm.mode();
        let x87 = disasm.architecture().is_x86().then(X87Features::default);
        Self {
            disasm,
            basic_mode,
            x87,
        }
    }

    pub fn disassembler(&self) -> &D {
        &self.disasm
    }

    fn target_operand(&self, ins: &Instruction, flow: FlowKind) -> Value {
        if flow == FlowKind::Return {
            // `ret imm16` carries a stack adjustment, not a target
            return Value::Unknown;
        }
        let imm = match flow {
            FlowKind::CondBranch => ins.last_immediate(),
            _ => ins.immediate_target(),
        };
        if let Some(t) = imm {
            let t = match self.disasm.architecture() {
                // Engine prints RISC-V targets as PC-relative offsets.
                Arch::RISCV | Arch::RISCV64 => ins.address.wrapping_add(t),
                _ => t,
            };
            return Value::Const(t);
        }
        if ins.operands.iter().any(|op| op.is_memory()) {
            return Value::Unknown;
        }
        ins.registers()
            .next()
            .map(|r| Value::Register(r.to_string()))
            .unwrap_or(Value::Unknown)
    }

    fn emit_x87(&self, ins: &Instruction, irb: &mut IrBuilder<'_>) {
        let Some(x87) = &self.x87 else {
            return;
        };
        let m = ins.mnemonic.to_ascii_lowercase();
        let st0 = || vec![Value::Register("st0".to_string())];
        if m.starts_with("fld") || m == "fild" || m == "fbld" {
            irb.emit_intrinsic(x87.data_store.clone(), st0());
            irb.emit_intrinsic(x87.tag_store.clone(), st0());
        } else if m.starts_with("fst") || m.starts_with("fist") || m == "fbstp" {
            irb.emit_intrinsic(x87.data_load.clone(), st0());
            irb.emit_intrinsic(x87.tag_load.clone(), st0());
        } else if m == "ffree" {
            irb.emit_intrinsic(x87.tag_store.clone(), st0());
        } else if m == "fxam" {
            irb.emit_intrinsic(x87.tag_load.clone(), st0());
        }
    }
}

impl<D: Disassembler> InstructionTranslator for DisasmTranslator<D> {
    fn arch(&self) -> Arch {
        self.disasm.architecture()
    }

    fn basic_mode(&self) -> ArchMode {
        self.basic_mode
    }

    fn current_mode(&self) -> ArchMode {
        self.disasm.mode()
    }

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()> {
        self.disasm.set_mode(mode)
    }

    fn translate_one(
        &mut self,
        bytes: &[u8],
        address: u64,
        irb: &mut IrBuilder<'_>,
    ) -> TranslationResult {
        let ins = match self.disasm.disassemble_instruction(address, bytes) {
            Ok(ins) => ins,
            Err(e) => {
                trace!(address = format_args!("{:#x}", address), error = %e, "decode failed");
                return TranslationResult::failure();
            }
        };
        let size = ins.length as usize;
        if size == 0 || size > bytes.len() {
            return TranslationResult::failure();
        }

        let asm = irb.emit_asm(address, size, ins.disassembly());
        self.emit_x87(&ins, irb);

        let Some(flow) = classify_flow(&ins, self.disasm.architecture()) else {
            return TranslationResult::plain(size, asm);
        };
        let target = self.target_operand(&ins, flow);
        let cond = if flow == FlowKind::CondBranch {
            ins.registers()
                .next()
                .map(|r| Value::Register(r.to_string()))
                .unwrap_or_default()
        } else {
            Value::Unknown
        };
        let next = address.wrapping_add(size as u64);
        let ph = irb.emit_placeholder(flow, address, next, target.clone(), cond);
        trace!(
            address = format_args!("{:#x}", address),
            %flow,
            target = %target,
            "control transfer"
        );
        TranslationResult::control(size, asm, flow, ph, target)
    }

    fn x87_features(&self) -> Option<&X87Features> {
        self.x87.as_ref()
    }
}
