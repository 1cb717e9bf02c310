//! Instruction translation contract.
//!
//! A translator decodes one machine instruction at a time and emits its IR
//! at a builder cursor. Control transfers are emitted as placeholders; the
//! decoder rewrites them once their destinations exist.

mod classify;
mod disasm;

pub use classify::classify_flow;
pub use disasm::DisasmTranslator;

use crate::core::binary::Arch;
use crate::core::disassembler::{ArchMode, DisassemblerResult};
use crate::ir::{FlowKind, InstId, IrBuilder, PlaceholderId, Value};

/// Outcome of translating one instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationResult {
    /// Bytes consumed; zero on failure
    pub size: usize,
    /// Marker emitted for the machine instruction
    pub asm_inst: Option<InstId>,
    /// Kind of control transfer, if the instruction ends a run
    pub flow: Option<FlowKind>,
    pub placeholder: Option<PlaceholderId>,
    /// Target operand of the transfer (taken target for cond branches)
    pub target: Value,
}

impl TranslationResult {
    pub fn failure() -> Self {
        Self::default()
    }

    pub fn plain(size: usize, asm_inst: InstId) -> Self {
        Self {
            size,
            asm_inst: Some(asm_inst),
            ..Self::default()
        }
    }

    pub fn control(
        size: usize,
        asm_inst: InstId,
        flow: FlowKind,
        placeholder: PlaceholderId,
        target: Value,
    ) -> Self {
        Self {
            size,
            asm_inst: Some(asm_inst),
            flow: Some(flow),
            placeholder: Some(placeholder),
            target,
        }
    }

    pub fn failed(&self) -> bool {
        self.size == 0 || self.asm_inst.is_none()
    }

    pub fn is_call(&self) -> bool {
        self.flow == Some(FlowKind::Call)
    }

    pub fn is_return(&self) -> bool {
        self.flow == Some(FlowKind::Return)
    }

    pub fn is_branch(&self) -> bool {
        self.flow == Some(FlowKind::Branch)
    }

    pub fn is_cond_branch(&self) -> bool {
        self.flow == Some(FlowKind::CondBranch)
    }

    pub fn constant_target(&self) -> Option<u64> {
        self.target.as_const()
    }
}

/// Names of the pseudo functions placeholders stand for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PseudoFunctions {
    pub call: String,
    pub ret: String,
    pub branch: String,
    pub cond_branch: String,
}

impl Default for PseudoFunctions {
    fn default() -> Self {
        Self {
            call: "__pseudo_call".to_string(),
            ret: "__pseudo_return".to_string(),
            branch: "__pseudo_branch".to_string(),
            cond_branch: "__pseudo_cond_branch".to_string(),
        }
    }
}

/// x86 FPU register-stack helpers the translator calls into.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct X87Features {
    pub data_load: String,
    pub tag_load: String,
    pub data_store: String,
    pub tag_store: String,
}

impl Default for X87Features {
    fn default() -> Self {
        Self {
            data_load: "__frontend_reg_load.fpr".to_string(),
            tag_load: "__frontend_reg_load.fpu_tag".to_string(),
            data_store: "__frontend_reg_store.fpr".to_string(),
            tag_store: "__frontend_reg_store.fpu_tag".to_string(),
        }
    }
}

pub trait InstructionTranslator {
    fn arch(&self) -> Arch;

    /// Mode the translator starts in.
    fn basic_mode(&self) -> ArchMode;

    fn current_mode(&self) -> ArchMode;

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()>;

    /// Decode the instruction at the start of `bytes` and emit its IR at
    /// the builder's cursor.
    fn translate_one(
        &mut self,
        bytes: &[u8],
        address: u64,
        irb: &mut IrBuilder<'_>,
    ) -> TranslationResult;

    fn pseudo_functions(&self) -> PseudoFunctions {
        PseudoFunctions::default()
    }

    /// Present only on translators that model the x87 register stack.
    fn x87_features(&self) -> Option<&X87Features> {
        None
    }
}

/// Picks the instruction-set mode for an address.
pub trait ModeResolver {
    /// Returns the address to decode at and the mode to decode it in.
    fn resolve(&self, address: u64, current: ArchMode) -> (u64, ArchMode);
}

/// ARM interworking: an odd address means Thumb. Everything else keeps the
/// current mode.
#[derive(Debug, Clone, Copy)]
pub struct DefaultModeResolver {
    arch: Arch,
}

impl DefaultModeResolver {
    pub fn new(arch: Arch) -> Self {
        Self { arch }
    }
}

impl ModeResolver for DefaultModeResolver {
    fn resolve(&self, address: u64, current: ArchMode) -> (u64, ArchMode) {
        if self.arch == Arch::ARM {
            if address % 2 == 1 {
                return (address & !1, ArchMode::Thumb);
            }
            if current == ArchMode::Unknown {
                return (address, ArchMode::Arm);
            }
        }
        (address, current)
    }
}
