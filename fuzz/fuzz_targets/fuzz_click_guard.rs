#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary markup, including markup that never mentions the marker,
    // must never panic the rewriter
    let guard = docindex::guard::ClickGuard::default();
    if let Ok(outcome) = guard.apply(data) {
        let _ = guard.apply(&outcome.html);
    }
    let _ = docindex::guard::disable_pointer_events(Some(data));
});
