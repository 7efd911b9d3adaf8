#![no_main]
use libfuzzer_sys::fuzz_target;
use moby_lib::dxt::{decode_rgba8, TextureFormat};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let width = data[0] as usize;
    let height = data[1] as usize;
    let format = match TextureFormat::try_from(data[2]) {
        Ok(format) => format,
        Err(_) => return,
    };

    if let Ok(rgba) = decode_rgba8(&data[3..], width, height, format) {
        assert_eq!(width * height * 4, rgba.len());
    }
});
