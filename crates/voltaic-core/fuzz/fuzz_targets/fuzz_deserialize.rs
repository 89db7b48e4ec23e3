#![no_main]
use libfuzzer_sys::fuzz_target;
use voltaic_core::engine::Engine;
use voltaic_core::test_utils::test_registry;

fuzz_target!(|data: &[u8]| {
    // Must not panic -- returning Err is fine.
    let _ = Engine::deserialize(data, test_registry());
});
