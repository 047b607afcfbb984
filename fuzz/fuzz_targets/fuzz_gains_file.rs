#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(file) = heater_config::GainsFile::from_toml(data) {
        // Whatever parses must serialize again.
        let text = file.to_toml().expect("serialize parsed gains");
        let again = heater_config::GainsFile::from_toml(&text).expect("reparse");
        assert_eq!(again.heaters.len(), file.heaters.len());
    }
});
