#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = proxi_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A valid config must resolve every sensor without panicking
            for s in &cfg.sensors {
                let _ = (s.display_name(), s.sample_window_size(), s.poll_interval_ms());
            }
            let _ = cfg.cycle_ms();
        }
    }
});
