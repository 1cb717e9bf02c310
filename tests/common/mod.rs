//! Common test utilities and helpers.
//!
//! `ScriptedTranslator` plays back a fixed list of instruction outcomes so
//! decoder behavior can be checked without a real instruction set.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use binlift::core::binary::Arch;
use binlift::core::disassembler::{ArchMode, DisassemblerResult};
use binlift::ir::{FlowKind, IrBuilder, Value};
use binlift::translator::{InstructionTranslator, TranslationResult};
use tempfile::NamedTempFile;

/// Outcome of translating the instruction at one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Plain(usize),
    Call(usize, Option<u64>),
    Ret(usize),
    Jump(usize, Option<u64>),
    CondJump(usize, Option<u64>),
    Fail,
}

impl Step {
    fn size(self) -> usize {
        match self {
            Step::Plain(n)
            | Step::Call(n, _)
            | Step::Ret(n)
            | Step::Jump(n, _)
            | Step::CondJump(n, _) => n,
            Step::Fail => 0,
        }
    }

    fn flow(self) -> Option<(FlowKind, Option<u64>)> {
        match self {
            Step::Call(_, t) => Some((FlowKind::Call, t)),
            Step::Ret(_) => Some((FlowKind::Return, None)),
            Step::Jump(_, t) => Some((FlowKind::Branch, t)),
            Step::CondJump(_, t) => Some((FlowKind::CondBranch, t)),
            _ => None,
        }
    }
}

/// Translator driven by an address-to-step script. Unscripted addresses
/// decode as one-byte plain instructions.
pub struct ScriptedTranslator {
    script: HashMap<u64, Step>,
    mode: ArchMode,
    /// Every address handed to `translate_one`, in order
    pub translated: Rc<RefCell<Vec<u64>>>,
}

impl ScriptedTranslator {
    pub fn new(steps: &[(u64, Step)]) -> Self {
        Self {
            script: steps.iter().copied().collect(),
            mode: ArchMode::X86_64,
            translated: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Rc<RefCell<Vec<u64>>> {
        Rc::clone(&self.translated)
    }
}

impl InstructionTranslator for ScriptedTranslator {
    fn arch(&self) -> Arch {
        Arch::X86_64
    }

    fn basic_mode(&self) -> ArchMode {
        ArchMode::X86_64
    }

    fn current_mode(&self) -> ArchMode {
        self.mode
    }

    fn set_mode(&mut self, mode: ArchMode) -> DisassemblerResult<()> {
        self.mode = mode;
        Ok(())
    }

    fn translate_one(
        &mut self,
        bytes: &[u8],
        address: u64,
        irb: &mut IrBuilder<'_>,
    ) -> TranslationResult {
        self.translated.borrow_mut().push(address);
        let step = self.script.get(&address).copied().unwrap_or(Step::Plain(1));
        let size = step.size();
        if size == 0 || size > bytes.len() {
            return TranslationResult::failure();
        }
        let asm = irb.emit_asm(address, size, format!("{:?}", step));
        match step.flow() {
            None => TranslationResult::plain(size, asm),
            Some((flow, target)) => {
                let target =
                    target.map_or_else(|| Value::Register("rax".to_string()), Value::Const);
                let next = address + size as u64;
                let ph = irb.emit_placeholder(flow, address, next, target.clone(), Value::Unknown);
                TranslationResult::control(size, asm, flow, ph, target)
            }
        }
    }
}

/// Creates a temporary file with the given content.
pub fn create_temp_file(content: &[u8]) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Minimal little-endian ELF64 x86-64 executable with a single `.text`
/// section at `text_addr` holding `code`, entry point at its start.
pub fn minimal_elf64(text_addr: u64, code: &[u8]) -> Vec<u8> {
    let shstrtab = b"\0.text\0.shstrtab\0";
    let text_off = 64u64;
    let shstr_off = text_off + code.len() as u64;
    let shoff = (shstr_off + shstrtab.len() as u64 + 7) & !7;

    let mut out = Vec::new();
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 2, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    out.extend_from_slice(&0x3eu16.to_le_bytes()); // EM_X86_64
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&text_addr.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // e_phoff
    out.extend_from_slice(&shoff.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&64u16.to_le_bytes());
    out.extend_from_slice(&56u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&64u16.to_le_bytes());
    out.extend_from_slice(&3u16.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    assert_eq!(out.len(), 64);

    out.extend_from_slice(code);
    out.extend_from_slice(shstrtab);
    out.resize(shoff as usize, 0);

    let mut shdr = |name: u32, ty: u32, flags: u64, addr: u64, off: u64, size: u64, align: u64| {
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&ty.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&addr.to_le_bytes());
        out.extend_from_slice(&off.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&align.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
    };
    shdr(0, 0, 0, 0, 0, 0, 0);
    // SHT_PROGBITS, SHF_ALLOC | SHF_EXECINSTR
    shdr(1, 1, 6, text_addr, text_off, code.len() as u64, 16);
    // SHT_STRTAB
    shdr(7, 3, 0, 0, shstr_off, shstrtab.len() as u64, 1);
    out
}
