use std::time::Duration;

use binlift::config::{Budgets, DecoderConfig};
use binlift::core::binary::Arch;
use binlift::core::segment::{SectionKind, Segment};
use binlift::decoder::{Decoder, JumpTargetKind};
use binlift::image::MemoryImage;
use binlift::ir::{Destination, Instruction, Value};
use binlift::LiftError;

use crate::common::{ScriptedTranslator, Step};

fn code_image(entry: u64, regions: &[(u64, usize)]) -> MemoryImage {
    let mut img = MemoryImage::new(Arch::X86_64).with_entry_point(entry);
    for &(start, len) in regions {
        img = img.with_code(start, vec![0x90; len]).unwrap();
    }
    img
}

#[test]
fn straight_run_ending_in_return() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[(0x1009, Step::Ret(1))]);
    let mut d = Decoder::new(&img, t, DecoderConfig::new()).unwrap();
    d.seed();
    assert_eq!(d.queue().len(), 1);

    let first = d.step().unwrap().unwrap();
    assert_eq!(first.kind, JumpTargetKind::EntryPoint);
    assert_eq!(first.address, 0x1000);
    assert!(d.queue().is_empty());
    assert!(d.patcher().is_empty());

    let out = d.finish().unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 1);
    assert_eq!(m.block_count(), 1);
    assert_eq!(out.stats.popped, 1);
    assert_eq!(out.stats.instructions, 10);
    let f = out.index.function_at(0x1000).unwrap();
    assert_eq!(m.function(f).name, "entry_point");
    let entry = m.function(f).entry_block().unwrap();
    assert_eq!(m.terminator(entry), Some(&Instruction::Return));
    assert_eq!(m.pending_placeholders().count(), 0);
    assert_eq!(out.allowed.total_size(), 6);
    assert!(!out.allowed.contains(0x1009));
}

#[test]
fn call_pushes_return_site_before_callee() {
    let img = code_image(0x1000, &[(0x1000, 0x10), (0x2000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::Call(5, Some(0x2000))),
        (0x1005, Step::Ret(1)),
        (0x2000, Step::Ret(1)),
    ]);
    let mut d = Decoder::new(&img, t, DecoderConfig::new()).unwrap();
    d.seed();
    d.step().unwrap();

    let queued: Vec<(JumpTargetKind, u64)> =
        d.queue().iter().map(|t| (t.kind, t.address)).collect();
    assert_eq!(
        queued,
        vec![
            (JumpTargetKind::CallReturnSite, 0x1005),
            (JumpTargetKind::CallTarget, 0x2000),
        ]
    );
    assert_eq!(JumpTargetKind::CallReturnSite.rank(), 0);
    assert_eq!(JumpTargetKind::CallTarget.rank(), 4);
    assert_eq!(d.patcher().len(), 1);

    let next = d.step().unwrap().unwrap();
    assert_eq!(next.kind, JumpTargetKind::CallReturnSite);

    let out = d.finish().unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 2);
    let main = out.index.function_at(0x1000).unwrap();
    let callee = out.index.function_at(0x2000).unwrap();
    assert_eq!(m.function(callee).name, "function_2000");

    let entry = m.function(main).entry_block().unwrap();
    let body: Vec<&Instruction> = m.block(entry).insts.iter().map(|&i| m.inst(i)).collect();
    assert_eq!(body.len(), 4);
    assert_eq!(body[0].asm_address(), Some(0x1000));
    assert_eq!(
        body[1],
        &Instruction::Call {
            callee: Destination::Function(callee)
        }
    );
    assert_eq!(body[2].asm_address(), Some(0x1005));
    assert_eq!(body[3], &Instruction::Return);
}

#[test]
fn cond_branch_resolves_after_both_arms_exist() {
    let img = code_image(0x1000, &[(0x1000, 0x30)]);
    let t = ScriptedTranslator::new(&[
        (0x1010, Step::CondJump(2, Some(0x1020))),
        (0x1014, Step::Ret(1)),
        (0x1020, Step::Ret(1)),
    ]);
    let mut d = Decoder::new(&img, t, DecoderConfig::new()).unwrap();
    d.seed();
    d.step().unwrap();

    let queued: Vec<(JumpTargetKind, u64)> =
        d.queue().iter().map(|t| (t.kind, t.address)).collect();
    assert_eq!(
        queued,
        vec![
            (JumpTargetKind::CondBranchFallthrough, 0x1012),
            (JumpTargetKind::CondBranchTaken, 0x1020),
        ]
    );
    let p = d.patcher().pending().next().unwrap();

    let ft = d.step().unwrap().unwrap();
    assert_eq!(ft.kind, JumpTargetKind::CondBranchFallthrough);
    assert!(d.patcher().is_pending(p));
    assert!(d.module().is_placeholder_pending(p));

    let taken = d.step().unwrap().unwrap();
    assert_eq!(taken.kind, JumpTargetKind::CondBranchTaken);
    assert!(d.patcher().is_empty());

    let out = d.finish().unwrap();
    let m = &out.module;
    let f = out.index.function_at(0x1000).unwrap();
    let starts: Vec<u64> = m
        .function(f)
        .blocks
        .iter()
        .map(|&b| m.block(b).start_address)
        .collect();
    assert_eq!(starts, vec![0x1000, 0x1012, 0x1020]);

    let entry = m.function(f).entry_block().unwrap();
    let b_ft = out.index.block_at(0x1012).unwrap();
    let b_taken = out.index.block_at(0x1020).unwrap();
    assert_eq!(
        m.terminator(entry),
        Some(&Instruction::CondBranch {
            cond: Value::Unknown,
            if_true: Destination::Block(b_taken),
            if_false: Destination::Block(b_ft),
        })
    );
    assert!(m.validate().is_ok());
}

#[test]
fn already_popped_address_binds_to_existing_block() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::CondJump(2, Some(0x1002))),
        (0x1002, Step::Ret(1)),
    ]);
    let log = t.log();
    let mut d = Decoder::new(&img, t, DecoderConfig::new()).unwrap();
    d.seed();
    d.step().unwrap();
    d.step().unwrap();
    assert!(d.queue().was_already_popped(0x1002));
    let again = d.step().unwrap().unwrap();
    assert_eq!(again.kind, JumpTargetKind::CondBranchTaken);

    let out = d.finish().unwrap();
    assert_eq!(*log.borrow(), vec![0x1000, 0x1002]);
    assert_eq!(out.stats.already_owned, 1);
    let m = &out.module;
    let entry = out.index.block_at(0x1000).unwrap();
    let b = out.index.block_at(0x1002).unwrap();
    assert_eq!(
        m.terminator(entry),
        Some(&Instruction::CondBranch {
            cond: Value::Unknown,
            if_true: Destination::Block(b),
            if_false: Destination::Block(b),
        })
    );
}

#[test]
fn backward_branch_splits_block() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[(0x1003, Step::Jump(2, Some(0x1001)))]);
    let log = t.log();
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(*log.borrow(), vec![0x1000, 0x1001, 0x1002, 0x1003]);
    assert_eq!(out.stats.block_splits, 1);

    let m = &out.module;
    let head = out.index.block_at(0x1000).unwrap();
    let tail = out.index.block_at(0x1001).unwrap();
    assert_eq!(m.block(tail).name, "bb_1001");
    assert_eq!(
        m.terminator(head),
        Some(&Instruction::Branch {
            target: Destination::Block(tail)
        })
    );
    assert_eq!(
        m.terminator(tail),
        Some(&Instruction::Branch {
            target: Destination::Block(tail)
        })
    );
    assert_eq!(m.block_asm(tail).count(), 3);
    assert!(m.validate().is_ok());
}

#[test]
fn call_into_middle_of_function_is_structural() {
    let img = code_image(0x1000, &[(0x1000, 0x10), (0x2000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::Call(5, Some(0x2000))),
        (0x1005, Step::Call(5, Some(0x2002))),
        (0x100a, Step::Ret(1)),
        (0x2004, Step::Ret(1)),
    ]);
    let err = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, LiftError::Structural { address: 0x2002, .. }), "{err}");
}

#[test]
fn call_into_own_body_becomes_block() {
    let img = code_image(0x1000, &[(0x1000, 0x20)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::CondJump(2, Some(0x1010))),
        (0x1002, Step::Call(5, Some(0x1008))),
        (0x1007, Step::Ret(1)),
        (0x1010, Step::Ret(1)),
    ]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 1);
    assert_eq!(out.stats.instructions, 12);

    let f = out.index.function_at(0x1000).unwrap();
    let starts: Vec<u64> = m
        .function(f)
        .blocks
        .iter()
        .map(|&b| m.block(b).start_address)
        .collect();
    assert_eq!(starts, vec![0x1000, 0x1002, 0x1008, 0x1010]);

    let caller = out.index.block_at(0x1002).unwrap();
    let body = out.index.block_at(0x1008).unwrap();
    let done = out.index.block_at(0x1010).unwrap();
    assert!(m
        .block(caller)
        .insts
        .iter()
        .any(|&i| m.inst(i) == &Instruction::Call { callee: Destination::Block(body) }));
    assert_eq!(
        m.terminator(body),
        Some(&Instruction::Branch {
            target: Destination::Block(done)
        })
    );
    assert_eq!(m.pending_placeholders().count(), 0);
    assert!(m.validate().is_ok());
}

/// main calls 0x2000 and 0x3000; the function at 0x2000 has an undecoded
/// gap at 0x2002..0x2008.
fn two_callees(third: Step) -> (MemoryImage, ScriptedTranslator) {
    let img = code_image(0x1000, &[(0x1000, 0x10), (0x2000, 0x10), (0x3000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::Call(5, Some(0x2000))),
        (0x1005, Step::Call(5, Some(0x3000))),
        (0x100a, Step::Ret(1)),
        (0x2000, Step::CondJump(2, Some(0x2008))),
        (0x2002, Step::Ret(1)),
        (0x2008, Step::Ret(1)),
        (0x3000, third),
        (0x3002, Step::Ret(1)),
    ]);
    (img, t)
}

#[test]
fn branch_into_undecoded_part_of_other_function_is_structural() {
    let (img, t) = two_callees(Step::Jump(2, Some(0x2005)));
    let err = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, LiftError::Structural { address: 0x2005, .. }), "{err}");
}

#[test]
fn cond_branch_into_other_function_body_is_structural() {
    let (img, t) = two_callees(Step::CondJump(2, Some(0x2002)));
    let err = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap_err();
    assert!(matches!(err, LiftError::Structural { address: 0x2002, .. }), "{err}");
}

#[test]
fn branch_to_other_function_entry_is_a_tail_call() {
    let (img, t) = two_callees(Step::Jump(2, Some(0x2000)));
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    let callee = out.index.function_at(0x2000).unwrap();
    let tail = out.index.block_at(0x3000).unwrap();
    assert_eq!(
        m.terminator(tail),
        Some(&Instruction::Branch {
            target: Destination::Function(callee)
        })
    );
    let order: Vec<u64> = m.functions().map(|(_, f)| f.entry_address).collect();
    assert_eq!(order, vec![0x1000, 0x2000, 0x3000]);
}

#[test]
fn timeout_budget_aborts_run() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let budgets = Budgets {
        timeout_ms: 1,
        ..Budgets::unlimited()
    };
    let config = DecoderConfig::new().with_budgets(budgets);
    let mut d = Decoder::new(&img, ScriptedTranslator::new(&[]), config).unwrap();
    d.seed();
    std::thread::sleep(Duration::from_millis(20));
    let err = d.step().unwrap_err();
    assert!(matches!(err, LiftError::Timeout { millis: 1 }), "{err}");
    assert_eq!(d.stats().popped, 0);
}

#[test]
fn unreachable_and_indirect_targets_leave_graph() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1000, Step::Call(5, Some(0x9000))),
        (0x1005, Step::Jump(2, None)),
    ]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 1);
    assert_eq!(out.stats.unreachable, 1);
    let entry = out.index.block_at(0x1000).unwrap();
    assert_eq!(
        m.successors(entry),
        vec![
            Destination::External(0x9000),
            Destination::Indirect(Value::Register("rax".to_string())),
        ]
    );
    assert_eq!(m.pending_placeholders().count(), 0);
}

#[test]
fn decode_failure_leaves_block_open() {
    let img = code_image(0x1000, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[(0x1002, Step::Fail)]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(out.stats.failed_translations, 1);
    assert_eq!(out.stats.instructions, 2);
    let entry = out.index.block_at(0x1000).unwrap();
    assert!(out.module.terminator(entry).is_none());
    assert!(!out.allowed.contains(0x1001));
    assert!(out.allowed.contains(0x1002));
}

#[test]
fn run_reaching_decoded_code_falls_through() {
    let img = code_image(0x1008, &[(0x1000, 0x10)]);
    let t = ScriptedTranslator::new(&[
        (0x1008, Step::Call(5, Some(0x1000))),
        (0x100d, Step::Ret(1)),
    ]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    let main = out.index.function_at(0x1008).unwrap();
    let helper = out.index.function_at(0x1000).unwrap();
    let body = m.function(helper).entry_block().unwrap();
    assert_eq!(m.block_asm(body).count(), 8);
    assert_eq!(
        m.terminator(body),
        Some(&Instruction::Branch {
            target: Destination::Function(main)
        })
    );
    // Only the tail after the return survives.
    assert_eq!(out.allowed.total_size(), 2);
}

#[test]
fn symbols_seed_named_functions() {
    let img = code_image(0x1000, &[(0x1000, 0x10)])
        .with_symbol("helper", 0x1008)
        .with_symbol("inside", 0x1001)
        .with_symbol("nowhere", 0x9000);
    let t = ScriptedTranslator::new(&[(0x1002, Step::Ret(1)), (0x1009, Step::Ret(1))]);
    let out = Decoder::new(&img, t, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 2);
    assert!(m.function_by_name("entry_point").is_some());
    assert!(m.function_by_name("helper").is_some());
    assert_eq!(out.stats.dropped_seeds, 1);
    assert_eq!(out.stats.popped, 3);
}

#[test]
fn seeds_may_use_alternative_ranges() {
    let mut img = MemoryImage::new(Arch::X86_64).with_entry_point(0x5000);
    img.add_segment(Segment::new(".data", 0x5000, 0x5010, SectionKind::Data), vec![0; 0x10])
        .unwrap();
    let script = [(0x5003, Step::Ret(1))];

    let out = Decoder::new(&img, ScriptedTranslator::new(&script), DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(out.module.function_count(), 1);
    assert!(!out.alternative.contains(0x5000));

    let mut config = DecoderConfig::new();
    config.use_alternative_ranges = false;
    let out = Decoder::new(&img, ScriptedTranslator::new(&script), config)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(out.module.function_count(), 0);
    assert_eq!(out.stats.unreachable, 1);
}
