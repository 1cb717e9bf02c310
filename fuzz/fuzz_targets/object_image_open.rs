#![no_main]
use binlift::image::{ByteImage, ObjectImage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(img) = ObjectImage::from_bytes(data.to_vec()) {
        for seg in img.segments() {
            let _ = img.raw_bytes_at(seg.start);
        }
    }
});
