#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The loader only reads from disk; one scratch file per fuzz process
    let path = std::env::temp_dir().join(format!("proxi-fuzz-{}.csv", std::process::id()));
    if std::fs::write(&path, data).is_err() {
        return;
    }
    if let Ok(rows) = proxi_config::load_trace_csv(&path) {
        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));
    }
});
