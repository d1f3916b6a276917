#![no_main]
use libfuzzer_sys::fuzz_target;

// Parsing and validating arbitrary TOML may fail but must never panic.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = tracker_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = cfg.axis_h.has_bridge();
    }
});
