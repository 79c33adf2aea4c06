//! Fuzz target: `SystemConfig::from_json`
//!
//! Arbitrary bytes must either be rejected or parse into a config that
//! passes validation.  Never panics.
//!
//! cargo fuzz run fuzz_system_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use sense::config::SystemConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = SystemConfig::from_json(json) {
        assert!(config.validate().is_ok(), "from_json returned an invalid config");
    }
});
