#![no_main]
use binlift::config::{Budgets, DecoderConfig};
use binlift::core::binary::Arch;
use binlift::decoder::Decoder;
use binlift::image::MemoryImage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(img) = MemoryImage::new(Arch::X86_64)
        .with_entry_point(0x1000)
        .with_code(0x1000, data.to_vec())
    else {
        return;
    };
    let budgets = Budgets {
        timeout_ms: 1_000,
        ..Budgets::default()
    };
    if let Ok(d) = Decoder::for_image(&img, DecoderConfig::new().with_budgets(budgets)) {
        if let Ok(out) = d.run() {
            assert!(out.module.validate().is_ok());
        }
    }
});
