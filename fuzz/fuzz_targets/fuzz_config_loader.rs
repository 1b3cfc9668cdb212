#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary TOML must either fail to parse or validate without panicking.
    if let Ok(cfg) = toml::from_str::<qtr_config::Config>(data) {
        let _ = cfg.validate();
    }
});
