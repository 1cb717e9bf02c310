use binlift::config::DecoderConfig;
use binlift::core::binary::Arch;
use binlift::decoder::Decoder;
use binlift::image::MemoryImage;
use binlift::ir::{Destination, Instruction};

/// call helper; test eax, eax; je done; xor eax, eax; done: ret;
/// 4 nops; helper: mov eax, 1; ret
pub const PROGRAM: [u8; 22] = [
    0xe8, 0x0b, 0x00, 0x00, 0x00, // 0x401000 call 0x401010
    0x85, 0xc0, // 0x401005 test eax, eax
    0x74, 0x02, // 0x401007 je 0x40100b
    0x31, 0xc0, // 0x401009 xor eax, eax
    0xc3, // 0x40100b ret
    0x90, 0x90, 0x90, 0x90, // 0x40100c padding
    0xb8, 0x01, 0x00, 0x00, 0x00, // 0x401010 mov eax, 1
    0xc3, // 0x401015 ret
];

#[test]
fn x86_64_program_end_to_end() {
    binlift::logging::init_tracing();
    let img = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x401000)
        .with_code(0x401000, PROGRAM.to_vec())
        .unwrap();
    let out = Decoder::for_image(&img, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;

    assert_eq!(m.function_count(), 2);
    assert_eq!(out.stats.instructions, 7);
    let main = out.index.function_at(0x401000).unwrap();
    let helper = out.index.function_at(0x401010).unwrap();
    assert_eq!(m.function(main).name, "entry_point");
    assert_eq!(m.function(helper).name, "function_401010");

    let starts: Vec<u64> = m
        .function(main)
        .blocks
        .iter()
        .map(|&b| m.block(b).start_address)
        .collect();
    assert_eq!(starts, vec![0x401000, 0x401009, 0x40100b]);

    let entry = m.function(main).entry_block().unwrap();
    let ft = out.index.block_at(0x401009).unwrap();
    let done = out.index.block_at(0x40100b).unwrap();
    assert!(m.successors(entry).contains(&Destination::Function(helper)));
    match m.terminator(entry) {
        Some(Instruction::CondBranch {
            if_true, if_false, ..
        }) => {
            assert_eq!(if_true, &Destination::Block(done));
            assert_eq!(if_false, &Destination::Block(ft));
        }
        other => panic!("unexpected terminator {other:?}"),
    }
    assert_eq!(
        m.terminator(ft),
        Some(&Instruction::Branch {
            target: Destination::Block(done)
        })
    );
    assert_eq!(m.terminator(done), Some(&Instruction::Return));

    // Padding stays undecoded.
    assert_eq!(out.allowed.total_size(), 4);
    assert!(out.allowed.contains(0x40100c));
    assert!(out.x87.is_some());
    assert_eq!(out.pseudo_functions.call, "__pseudo_call");
    assert!(m.validate().is_ok());
    assert!(m.to_string().contains("entry_point"));
}

#[test]
fn call_next_instruction_splits_entry_block() {
    // call $+5; pop rax; ret
    let code = vec![0xe8, 0x00, 0x00, 0x00, 0x00, 0x58, 0xc3];
    let img = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x1000)
        .with_code(0x1000, code)
        .unwrap();
    let out = Decoder::for_image(&img, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;

    assert_eq!(m.function_count(), 1);
    assert_eq!(out.stats.block_splits, 1);
    let entry = out.index.block_at(0x1000).unwrap();
    let tail = out.index.block_at(0x1005).unwrap();
    assert!(m.successors(entry).contains(&Destination::Block(tail)));
    assert_eq!(
        m.terminator(entry),
        Some(&Instruction::Branch {
            target: Destination::Block(tail)
        })
    );
    assert_eq!(m.block_asm(tail).count(), 2);
    assert_eq!(m.terminator(tail), Some(&Instruction::Return));
    assert!(m.validate().is_ok());
}

#[test]
fn for_image_rejects_unknown_architecture() {
    let img = MemoryImage::new(Arch::Unknown)
        .with_entry_point(0x1000)
        .with_code(0x1000, vec![0x90; 4])
        .unwrap();
    let res = Decoder::for_image(&img, DecoderConfig::new());
    assert!(matches!(res, Err(binlift::LiftError::Translator { .. })));
}

#[test]
fn aarch64_straight_line_through_capstone() {
    // mov x0, #1; ret
    let code = vec![0x20, 0x00, 0x80, 0xd2, 0xc0, 0x03, 0x5f, 0xd6];
    let img = MemoryImage::new(Arch::AArch64)
        .with_entry_point(0x1000)
        .with_code(0x1000, code)
        .unwrap();
    let out = Decoder::for_image(&img, DecoderConfig::new())
        .unwrap()
        .run()
        .unwrap();
    let m = &out.module;
    assert_eq!(m.function_count(), 1);
    let entry = out.index.block_at(0x1000).unwrap();
    assert_eq!(m.block_asm(entry).count(), 2);
    assert_eq!(m.terminator(entry), Some(&Instruction::Return));
    assert!(out.x87.is_none());
}
