//! Fuzz target for run-list entry parsing and group name sanitization.

#![no_main]

use chef_inventory::inventory::{sanitize_group_name, RunListEntry};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|entry: &str| {
    if let Some(parsed) = RunListEntry::parse(entry) {
        assert!(entry.starts_with(parsed.kind.as_str()));
        assert!(entry.ends_with(']'));
        assert!(entry.contains(parsed.identifier));
    }

    let once = sanitize_group_name(entry);
    assert_eq!(sanitize_group_name(&once), once);
    assert!(once
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
});
