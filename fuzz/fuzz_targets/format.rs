#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: FormatInfo::detect with arbitrary bytes.
//
// Catches bugs in:
// - Version byte bounds (offset 24/25)
// - Compression bit classification
// - Short buffer handling
fuzz_target!(|data: &[u8]| {
    let _ = lasio_wire::FormatInfo::detect(data);
});
