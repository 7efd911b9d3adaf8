#![no_main]
use libfuzzer_sys::fuzz_target;
use moby_lib::prelude::*;
use std::io::Cursor;

const OFFSET: u64 = 0x14;

fuzz_target!(|data: &[u8]| {
    // Test that this doesn't panic on errors.
    let mut reader = Cursor::new(data);
    if let Ok(model) = MobyModel::read(&mut reader, GameType::RaC1, 5, OFFSET) {
        let bytes = model.to_bytes(OFFSET).unwrap();

        let mut output = vec![0u8; OFFSET as usize];
        output.extend_from_slice(&bytes);
        let _result = MobyModel::read(&mut Cursor::new(output), GameType::RaC1, 5, OFFSET);
    }
});
