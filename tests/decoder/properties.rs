use std::collections::HashSet;

use binlift::config::{Budgets, DecoderConfig};
use binlift::core::binary::Arch;
use binlift::core::disassembler::ArchMode;
use binlift::decoder::{Decoder, JumpOrigin, JumpTarget, JumpTargetKind, JumpTargetQueue};
use binlift::image::MemoryImage;
use binlift::translator::ModeResolver;
use binlift::LiftError;

use crate::common::{ScriptedTranslator, Step};

/// A branchy program: two calls, a diamond and a loop.
fn branchy() -> (MemoryImage, Vec<(u64, Step)>) {
    let img = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x1000)
        .with_code(0x1000, vec![0x90; 0x40])
        .unwrap()
        .with_code(0x2000, vec![0x90; 0x20])
        .unwrap();
    let script = vec![
        (0x1000, Step::Call(5, Some(0x2000))),
        (0x1005, Step::CondJump(2, Some(0x1010))),
        (0x1007, Step::Plain(3)),
        (0x100a, Step::Jump(2, Some(0x1014))),
        (0x1010, Step::Plain(2)),
        (0x1012, Step::Plain(2)),
        (0x1014, Step::CondJump(2, Some(0x1012))),
        (0x1016, Step::Call(5, Some(0x2010))),
        (0x101b, Step::Ret(1)),
        (0x2004, Step::Ret(1)),
        (0x2010, Step::Jump(2, Some(0x2000))),
    ];
    (img, script)
}

#[test]
fn pop_returns_least_rank_then_address() {
    let mut q = JumpTargetQueue::new();
    let mut expected = Vec::new();
    let mut seed = 0x2545_f491u64;
    for _ in 0..200 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let kind = JumpTargetKind::ALL[(seed >> 33) as usize % JumpTargetKind::ALL.len()];
        let address = 0x1000 + ((seed >> 40) % 64);
        if q.push(JumpTarget::new(address, kind, ArchMode::X86_64, JumpOrigin::None)) {
            expected.push((kind.rank(), address));
        }
    }
    let before = q.len();
    if let Some(&(rank, address)) = expected.first() {
        let kind = JumpTargetKind::ALL[rank as usize];
        assert!(!q.push(JumpTarget::new(address, kind, ArchMode::X86_64, JumpOrigin::None)));
        assert_eq!(q.len(), before);
    }
    expected.sort();
    let popped: Vec<(u8, u64)> = std::iter::from_fn(|| q.pop())
        .map(|t| (t.kind.rank(), t.address))
        .collect();
    assert_eq!(popped, expected);
}

#[test]
fn every_byte_translated_at_most_once() {
    let (img, script) = branchy();
    let t = ScriptedTranslator::new(&script);
    let log = t.log();
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();

    let log = log.borrow();
    let unique: HashSet<u64> = log.iter().copied().collect();
    assert_eq!(unique.len(), log.len());

    let covered: u64 = out
        .module
        .blocks()
        .flat_map(|(b, _)| out.module.block_asm(b))
        .map(|m| m.size as u64)
        .sum();
    assert_eq!(covered, out.decoded.total_size());
    assert!(out.module.validate().is_ok());
}

#[test]
fn allowed_only_shrinks_and_excludes_decoded_runs() {
    let (img, script) = branchy();
    let mut d = Decoder::new(&img, ScriptedTranslator::new(&script), DecoderConfig::new()).unwrap();
    d.seed();
    let mut last = d.allowed().total_size();
    while d.step().unwrap().is_some() {
        let now = d.allowed().total_size();
        assert!(now <= last, "allowed grew from {last} to {now}");
        last = now;
        for (b, _) in d.module().blocks() {
            for m in d.module().block_asm(b) {
                assert!(!d.allowed().contains(m.address), "{:#x} still allowed", m.address);
            }
        }
    }
    d.finish().unwrap();
}

#[test]
fn no_placeholder_survives_a_run() {
    let (img, script) = branchy();
    let out = Decoder::new(&img, ScriptedTranslator::new(&script), DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    assert_eq!(m.pending_placeholders().count(), 0);
    assert_eq!(m.function_count(), 3);
    assert!(out.stats.popped_by_kind[&JumpTargetKind::CallReturnSite] >= 2);
}

#[test]
fn instruction_budget_aborts_run() {
    let img = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x1000)
        .with_code(0x1000, vec![0x90; 0x10])
        .unwrap();
    let budgets = Budgets {
        max_instructions: 3,
        ..Budgets::unlimited()
    };
    let config = DecoderConfig::new().with_budgets(budgets);
    let err = Decoder::new(&img, ScriptedTranslator::new(&[]), config)
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        LiftError::ResourceExhausted { used: 3, limit: 3, .. }
    ));
}

#[test]
fn function_budget_aborts_run() {
    let (img, script) = branchy();
    let budgets = Budgets {
        max_functions: 1,
        ..Budgets::default()
    };
    let config = DecoderConfig::new().with_budgets(budgets);
    let err = Decoder::new(&img, ScriptedTranslator::new(&script), config)
        .unwrap()
        .run()
        .unwrap_err();
    match err {
        LiftError::ResourceExhausted { resource, .. } => assert_eq!(resource, "functions"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_config_rejected_before_decoding() {
    let (img, _) = branchy();
    let mut config = DecoderConfig::new();
    config.entry_point_name.clear();
    let res = Decoder::new(&img, ScriptedTranslator::new(&[]), config);
    assert!(matches!(res, Err(LiftError::InvalidInput(_))));
}

struct ClearLowBit;

impl ModeResolver for ClearLowBit {
    fn resolve(&self, address: u64, _current: ArchMode) -> (u64, ArchMode) {
        (address & !1, ArchMode::X86_32)
    }
}

#[test]
fn custom_mode_resolver_applies_to_seeds() {
    let img = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x1001)
        .with_code(0x1000, vec![0x90; 0x10])
        .unwrap();
    let t = ScriptedTranslator::new(&[(0x1002, Step::Ret(1))]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .with_mode_resolver(ClearLowBit)
        .run()
        .unwrap();
    assert!(out.index.function_at(0x1000).is_some());
    assert!(out.index.function_at(0x1001).is_none());
}
