#![no_main]
use libfuzzer_sys::fuzz_target;
use midips::engine::apply_patch;
use midips::ips::ApplyOptions;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte picks the destination size and the above-u24 flag.
    let flags = data[0];
    let dest = vec![0xA5u8; (flags & 0x7F) as usize];
    let opts = ApplyOptions {
        allow_above_u24: flags & 0x80 != 0,
    };

    // Arbitrary hunk bytes behind a valid header, then fully arbitrary input.
    let mut patch = b"PATCH".to_vec();
    patch.extend_from_slice(&data[1..]);
    if let Ok(out) = apply_patch(&patch, &dest, &opts) {
        assert_eq!(out.len(), dest.len());
    }
    let _ = apply_patch(&data[1..], &dest, &opts);
});
