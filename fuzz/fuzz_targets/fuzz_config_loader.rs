#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject the input but must never panic.
    if let Ok(cfg) = heater_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A valid table always resolves its own heater names.
            for (i, h) in cfg.heaters.iter().enumerate() {
                assert_eq!(cfg.heater_index(&h.name), Some(i));
            }
            let _ = cfg.control.effective_bang_bang_threshold();
        }
    }
});
