//! Fuzz target: status document merge + decode
//!
//! Merges two arbitrary JSON documents the way the gateway merges partial
//! status updates, then decodes the result.  Neither step may panic, and
//! merging a document onto itself must leave it unchanged.
//!
//! cargo fuzz run fuzz_status_merge

#![no_main]

use ibcfill::gateway::telemetry::{Telemetry, merge_json};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (first, second) = text.split_once('\n').unwrap_or((&text, "{}"));
    let (Ok(base), Ok(patch)) = (
        serde_json::from_str::<Value>(first),
        serde_json::from_str::<Value>(second),
    ) else {
        return;
    };

    let mut doc = base.clone();
    merge_json(&mut doc, base.clone());
    assert_eq!(doc, base, "self-merge must be the identity");

    merge_json(&mut doc, patch);
    let _ = serde_json::from_value::<Telemetry>(doc);
});
