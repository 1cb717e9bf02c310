use crate::core::binary::Arch;
use crate::core::instruction::Instruction;
use crate::ir::FlowKind;

const ARM_CONDS: [&str; 16] = [
    "eq", "ne", "cs", "hs", "cc", "lo", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le",
];

/// `b<cond>` with an optional `.w`/`.n` width suffix.
fn is_arm_cond_branch(m: &str) -> bool {
    let m = m.trim_end_matches(".w").trim_end_matches(".n");
    m.strip_prefix('b')
        .is_some_and(|c| ARM_CONDS.contains(&c))
}

fn classify_x86(m: &str) -> Option<FlowKind> {
    match m {
        "ret" | "retq" | "retn" | "retf" | "iret" | "iretd" | "iretq" => Some(FlowKind::Return),
        "call" | "callq" => Some(FlowKind::Call),
        "jmp" | "jmpq" | "ljmp" => Some(FlowKind::Branch),
        "loop" | "loope" | "loopne" => Some(FlowKind::CondBranch),
        _ if m.starts_with('j') => Some(FlowKind::CondBranch),
        _ => None,
    }
}

fn classify_arm(m: &str, ops: &str) -> Option<FlowKind> {
    let pc_in_ops = ops.split(|c: char| !c.is_ascii_alphanumeric()).any(|t| t == "pc");
    match m {
        "bx" if ops.trim() == "lr" => Some(FlowKind::Return),
        "pop" | "pop.w" | "ldm" | "ldmia" | "ldmfd" if pc_in_ops => Some(FlowKind::Return),
        "mov" if ops.replace(' ', "") == "pc,lr" => Some(FlowKind::Return),
        "bl" | "blx" => Some(FlowKind::Call),
        "b" | "b.w" | "b.n" | "bx" => Some(FlowKind::Branch),
        "cbz" | "cbnz" => Some(FlowKind::CondBranch),
        _ if is_arm_cond_branch(m) => Some(FlowKind::CondBranch),
        _ => None,
    }
}

fn classify_aarch64(m: &str) -> Option<FlowKind> {
    match m {
        "ret" | "eret" => Some(FlowKind::Return),
        "bl" | "blr" => Some(FlowKind::Call),
        "b" | "br" => Some(FlowKind::Branch),
        "cbz" | "cbnz" | "tbz" | "tbnz" => Some(FlowKind::CondBranch),
        _ if m.starts_with("b.") => Some(FlowKind::CondBranch),
        _ => None,
    }
}

fn classify_mips(m: &str, ops: &str) -> Option<FlowKind> {
    match m {
        "jr" if ops.trim() == "$ra" => Some(FlowKind::Return),
        "jal" | "jalr" | "bal" => Some(FlowKind::Call),
        "j" | "jr" | "b" => Some(FlowKind::Branch),
        "break" => None,
        _ if m.starts_with('b') => Some(FlowKind::CondBranch),
        _ => None,
    }
}

fn classify_riscv(m: &str) -> Option<FlowKind> {
    let m = m.strip_prefix("c.").unwrap_or(m);
    match m {
        "ret" | "mret" | "sret" => Some(FlowKind::Return),
        "jal" | "jalr" => Some(FlowKind::Call),
        "j" | "jr" => Some(FlowKind::Branch),
        _ if m.starts_with('b') => Some(FlowKind::CondBranch),
        _ => None,
    }
}

fn classify_ppc(m: &str) -> Option<FlowKind> {
    match m {
        "blr" => Some(FlowKind::Return),
        "bl" | "bla" | "bctrl" | "blrl" => Some(FlowKind::Call),
        "b" | "ba" | "bctr" => Some(FlowKind::Branch),
        _ if m.starts_with('b') => Some(FlowKind::CondBranch),
        _ => None,
    }
}

/// Control-flow class of a decoded instruction, by mnemonic.
pub fn classify_flow(ins: &Instruction, arch: Arch) -> Option<FlowKind> {
    let m = ins.mnemonic.to_ascii_lowercase();
    let ops = ins.op_str.to_ascii_lowercase();
    match arch {
        Arch::X86_16 | Arch::X86 | Arch::X86_64 => classify_x86(&m),
        Arch::ARM => classify_arm(&m, &ops),
        Arch::AArch64 => classify_aarch64(&m),
        Arch::MIPS | Arch::MIPS64 => classify_mips(&m, &ops),
        Arch::RISCV | Arch::RISCV64 => classify_riscv(&m),
        Arch::PPC | Arch::PPC64 => classify_ppc(&m),
        Arch::Unknown => None,
    }
}
