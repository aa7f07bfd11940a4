#![no_main]

use libfuzzer_sys::fuzz_target;
use primtime::config::SuiteConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and validating arbitrary TOML must never panic
        if let Ok(config) = SuiteConfig::from_toml_str(input) {
            let _ = config.validate();
        }
    }
});
