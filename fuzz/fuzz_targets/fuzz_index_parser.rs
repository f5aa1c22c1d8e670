#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing may fail but must not panic; anything that parses must
    // validate and serialize without panicking either
    if let Ok(index) = docindex::index::parse_index(data) {
        let _ = docindex::index::validate(&index);
        let _ = docindex::index::to_js(&index);
        let _ = index.objects();
    }
});
