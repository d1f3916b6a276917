#![no_main]
use libfuzzer_sys::fuzz_target;

// The trace loader reads from a path, so each input goes through a temp file.
fuzz_target!(|data: &[u8]| {
    let path = std::env::temp_dir().join(format!("tracker-fuzz-{}.csv", std::process::id()));
    if std::fs::write(&path, data).is_err() {
        return;
    }
    if let Ok(rows) = tracker_config::load_light_trace_csv(&path) {
        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));
    }
});
