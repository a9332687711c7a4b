#![no_main]
use libfuzzer_sys::fuzz_target;
use midips::engine::{apply_patch, create_patch};
use midips::ips::{ApplyOptions, CreateOptions};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Use first byte as control flags.
    let flags = data[0];
    let payload = &data[1..];
    let opts = CreateOptions {
        eof_marker: flags & 1 != 0,
        ..Default::default()
    };

    // Split payload into equal-length "source" and "target".
    let half = payload.len() / 2;
    let (source, target) = (&payload[..half], &payload[half..half * 2]);

    let patch = create_patch(source, target, &opts).unwrap();
    let patched = apply_patch(&patch, source, &ApplyOptions::default()).unwrap();
    assert_eq!(patched, target);
});
