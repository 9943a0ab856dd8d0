//! Fuzz target for building an inventory from arbitrary node records.
//!
//! Any record may be rejected, but the build must never panic and a
//! successful build always carries the `_meta` envelope.

#![no_main]

use arbitrary::Arbitrary;
use chef_inventory::inventory::{CacheDocument, InventoryBuilder, META_KEY};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Debug, Arbitrary)]
struct FuzzNode {
    name: String,
    environment: Option<String>,
    ipaddress: Option<String>,
    roles: Vec<String>,
    recipes: Vec<String>,
    tags: Vec<String>,
    run_list: Vec<String>,
}

fuzz_target!(|nodes: Vec<FuzzNode>| {
    let cache: CacheDocument = nodes
        .into_iter()
        .map(|node| {
            let record = json!({
                "chef_environment": node.environment,
                "automatic": {
                    "ipaddress": node.ipaddress,
                    "roles": node.roles,
                    "expanded_run_list": node.recipes
                },
                "normal": {"tags": node.tags},
                "run_list": node.run_list
            });
            (node.name, record)
        })
        .collect();

    if let Ok(inventory) = InventoryBuilder::new().build(&cache) {
        assert_eq!(inventory.to_json()[META_KEY], json!({"hostvars": {}}));
    }
});
