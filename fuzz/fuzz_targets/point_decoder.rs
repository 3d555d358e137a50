#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    format_id: u8,
    record_len: u16,
    count: u32,
    probe: usize,
    buf: &'a [u8],
}

// Fuzz target: PointDecoder over a buffer whose declared count and
// record length need not match its size.
//
// Catches bugs in:
// - Record length validation per format
// - Index bounds vs. declared count
// - Record slicing past the end of a short chunk
fuzz_target!(|input: Input<'_>| {
    let Ok(decoder) =
        lasio_wire::PointDecoder::new(input.buf, input.format_id, input.record_len, input.count)
    else {
        return;
    };
    let _ = decoder.get_point(input.probe);
    for point in decoder.points().take(1024) {
        if point.is_err() {
            break;
        }
    }
});
