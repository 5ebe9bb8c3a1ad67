//! Fuzz target: console command parser
//!
//! cargo fuzz run fuzz_console

#![no_main]

use ibcfill::adapters::console::{ConsoleCommand, parse};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    if let Ok(ConsoleCommand::Settings(patch)) = parse(&line) {
        // Accepted settings are always usable targets.
        assert!(!patch.is_empty());
        let targets = patch.apply_to(Default::default());
        assert!(targets.is_valid(), "parser accepted {targets:?}");
    }
});
