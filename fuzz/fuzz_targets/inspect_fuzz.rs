#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::bps::{self, varint};

fuzz_target!(|data: &[u8]| {
    let mut offset = 0;
    while let Ok((_, next)) = varint::read_u64(data, offset) {
        offset = next;
    }

    let mut patch = bps::BPS_MAGIC.to_vec();
    patch.extend_from_slice(data);
    if let Ok((header, _, commands)) = bps::inspect(&patch) {
        let _ = header.metadata_str();
        for entry in commands {
            if entry.is_err() {
                break;
            }
        }
    }
});
