#![no_main]
use libfuzzer_sys::fuzz_target;
use oxibps::bps::{self, NoDiagnostics};

fuzz_target!(|data: &[u8]| {
    // Applying must never panic, only return errors.
    let _ = bps::apply_with(&[], data, &mut NoDiagnostics);

    // Split into source and patch; prefix the magic so the command
    // interpreter is reached more often.
    if data.len() >= 2 {
        let split = data[0] as usize % data.len();
        let (source, rest) = data.split_at(split);
        let mut patch = bps::BPS_MAGIC.to_vec();
        patch.extend_from_slice(rest);
        let _ = bps::apply_with(source, &patch, &mut NoDiagnostics);
    }
});
