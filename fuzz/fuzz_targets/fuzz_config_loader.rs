#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = vehicle_config::load_toml(data)
        && cfg.validate().is_ok()
    {
        // Anything that validates must also convert and pass the core checks.
        let core = vehicle_core::CoreConfig::from(&cfg);
        assert!(core.validate().is_ok(), "validated config rejected by core: {cfg:?}");
    }
});
