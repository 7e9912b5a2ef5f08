#![no_main]
use libfuzzer_sys::fuzz_target;
use tardiff::format::Instruction;

// Arbitrary bytes should never panic the instruction reader -- at worst it
// reports a truncated-triple or invalid-instruction error.
fuzz_target!(|data: &[u8]| {
    let mut cursor = data;
    loop {
        match Instruction::read(&mut cursor) {
            Ok(Some(inst)) => {
                if inst.is_terminator() {
                    break;
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
});
