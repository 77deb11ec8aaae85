#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation must reject bad input with errors, never panics.
    let parsed = toml::from_str::<lcr_config::Config>(data);
    match parsed {
        Ok(cfg) => {
            if cfg.validate().is_ok() {
                // A validated config always yields a buildable plan.
                let _ = lcr_core::RunPlan::try_from(&cfg);
            }
        }
        Err(_e) => {
            // parse error is acceptable
        }
    }
});
