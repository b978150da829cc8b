#![no_main]
#[macro_use]
extern crate libfuzzer_sys;

use image::ImageDecoder;
use std::io::Cursor;

// Pixel count above which the native decoder is skipped; each decoded pixel
// holds a full color entry.
const MAX_NATIVE_PIXELS: u64 = 64 * 1024;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = image_xwd::xwd::decode_config(Cursor::new(data)) {
        if u64::from(config.width) * u64::from(config.height) <= MAX_NATIVE_PIXELS {
            if let Ok(image) = image_xwd::xwd::decode(Cursor::new(data)) {
                let _ = std::hint::black_box(image.to_rgb8());
            }
        }
    }

    let reader = Cursor::new(data);
    let Ok(mut decoder) = image_xwd::xwd::XwdDecoder::new(reader) else {
        return;
    };
    let mut limits = image::Limits::default();
    limits.max_alloc = Some(1024 * 1024); // 1 MiB
    if limits.reserve(decoder.total_bytes()).is_err() {
        return;
    }
    if decoder.set_limits(limits).is_err() {
        return;
    }
    let _ = std::hint::black_box(image::DynamicImage::from_decoder(decoder));
});
