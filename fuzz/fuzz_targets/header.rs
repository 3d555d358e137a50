#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: Header::read_from with arbitrary bytes.
//
// Catches bugs in:
// - Fixed-offset field reads near the end of the buffer
// - Bounds de-interleaving
// - points_end arithmetic on hostile offsets and counts
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = lasio_wire::Header::read_from(data) {
        let _ = header.points_end();
        let _ = header.world_position([i32::MIN, 0, i32::MAX]);
    }
});
