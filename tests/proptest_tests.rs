//! Property-based tests for chef-inventory using proptest.
//!
//! Random names and node records are used to check the sanitizer and the
//! grouping invariants over inputs nobody would think to write by hand.

use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::json;

use chef_inventory::inventory::{
    sanitize_group_name, CacheDocument, InventoryBuilder, RunListEntry, META_KEY,
};

// ============================================================================
// Strategies for generating test data
// ============================================================================

/// Strategy for attribute values as they show up in Chef
fn chef_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_-]{0,20}",
        "[a-z]{1,8}::[a-z]{1,8}(@[0-9]\\.[0-9]\\.[0-9])?",
        "\\PC{0,30}",
        prop::string::string_regex("[:\\[\\]{}. /@]{0,20}").unwrap(),
    ]
}

fn ip() -> impl Strategy<Value = String> {
    (0u8..=255, 0u8..=255).prop_map(|(a, b)| format!("10.0.{a}.{b}"))
}

fn node() -> impl Strategy<Value = serde_json::Value> {
    (
        chef_name(),
        prop::option::of(ip()),
        vec(chef_name(), 0..4),
        vec(chef_name(), 0..4),
        vec(chef_name(), 0..3),
        vec(("(role|recipe)", "[a-z:]{0,10}"), 0..3),
    )
        .prop_map(|(env, ip, roles, recipes, tags, run_list)| {
            let mut automatic = json!({"roles": roles, "expanded_run_list": recipes});
            if let Some(ip) = ip {
                automatic["ipaddress"] = json!(ip);
            }
            let run_list: Vec<String> = run_list
                .into_iter()
                .map(|(kind, id)| format!("{kind}[{id}]"))
                .collect();
            json!({
                "chef_environment": env,
                "automatic": automatic,
                "normal": {"tags": tags},
                "run_list": run_list
            })
        })
}

fn cache() -> impl Strategy<Value = CacheDocument> {
    prop::collection::btree_map("[a-z0-9]{1,8}", node(), 0..8)
        .prop_map(|nodes| nodes.into_iter().collect())
}

// ============================================================================
// Sanitizer properties
// ============================================================================

proptest! {
    #[test]
    fn sanitize_is_idempotent(word in chef_name()) {
        let once = sanitize_group_name(&word);
        prop_assert_eq!(sanitize_group_name(&once), once);
    }

    #[test]
    fn sanitize_output_charset(word in chef_name()) {
        let out = sanitize_group_name(&word);
        prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn sanitize_never_grows(word in "\\PC{0,50}") {
        let out = sanitize_group_name(&word);
        prop_assert!(out.chars().count() <= word.chars().count());
    }

    #[test]
    fn well_formed_entries_parse(kind in "(role|recipe)", id in "\\PC{0,20}") {
        let entry = format!("{kind}[{id}]");
        let parsed = RunListEntry::parse(&entry);
        prop_assert!(parsed.is_some());
        prop_assert_eq!(parsed.unwrap().kind.as_str(), kind.as_str());
    }
}

// ============================================================================
// Grouping properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn build_is_deterministic(cache in cache()) {
        let builder = InventoryBuilder::new();
        let first = builder.build(&cache).unwrap();
        let second = builder.build(&cache).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn only_addressed_nodes_appear(cache in cache()) {
        let inventory = InventoryBuilder::new().build(&cache).unwrap();
        let addresses: Vec<String> = cache
            .iter()
            .filter_map(|(_, record)| record["automatic"]["ipaddress"].as_str().map(String::from))
            .collect();

        for name in inventory.group_names() {
            for member in inventory.group(name).unwrap() {
                prop_assert!(addresses.contains(member));
            }
        }
    }

    #[test]
    fn meta_envelope_is_constant(cache in cache()) {
        let value = InventoryBuilder::new().build(&cache).unwrap().to_json();
        prop_assert_eq!(&value[META_KEY], &json!({"hostvars": {}}));
    }
}
