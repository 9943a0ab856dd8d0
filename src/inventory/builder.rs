//! Inventory grouping.
//!
//! Turns the cached node snapshot into the JSON document dynamic inventory
//! consumers expect from `--list`:
//!
//! ```json
//! {
//!   "_meta": { "hostvars": {} },
//!   "chef_environment_prod": ["10.0.0.1"],
//!   "role_web": ["10.0.0.1"]
//! }
//! ```
//!
//! Each node contributes its IP address to one group per environment, role,
//! expanded recipe, tag and run-list entry. Group names are a kind prefix
//! followed by the sanitized value.

use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::{debug, info};

use super::node::{CacheDocument, RawNode, RunListEntry};
use super::sanitize::sanitize_group_name;
use crate::error::{Error, Result};

/// Reserved top-level key carrying host variables
pub const META_KEY: &str = "_meta";

/// Group name prefix for environments
pub const ENVIRONMENT_PREFIX: &str = "chef_environment";
/// Group name prefix for expanded roles
pub const ROLE_PREFIX: &str = "role";
/// Group name prefix for expanded recipes
pub const RECIPE_PREFIX: &str = "recipe";
/// Group name prefix for tags
pub const TAG_PREFIX: &str = "tag";

// ============================================================================
// Inventory Document
// ============================================================================

/// Grouped inventory: group name to the set of member addresses.
///
/// Serializes with groups in sorted order, members as sorted arrays, and the
/// `_meta` envelope with empty `hostvars`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryDocument {
    groups: BTreeMap<String, BTreeSet<String>>,
}

impl InventoryDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `host` to `group`.
    ///
    /// Returns `false` if the membership already existed or the group name is
    /// the reserved `_meta` key, which is never treated as a group.
    pub fn add_member(&mut self, group: impl Into<String>, host: impl Into<String>) -> bool {
        let group = group.into();
        if group == META_KEY {
            return false;
        }
        self.groups.entry(group).or_default().insert(host.into())
    }

    /// Members of a group
    pub fn group(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.groups.get(name)
    }

    /// Check if a group exists
    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Group names in sorted order
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups (excluding `_meta`)
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Check if there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Convert to a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing string maps into a Value cannot fail
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Render as pretty JSON with sorted keys and 2-space indentation
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_json())
    }
}

impl Serialize for InventoryDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len() + 1))?;
        map.serialize_entry(META_KEY, &HostVars::default())?;
        for (name, members) in &self.groups {
            map.serialize_entry(name, members)?;
        }
        map.end()
    }
}

/// Body of the `_meta` key
#[derive(Debug, Default, serde::Serialize)]
struct HostVars {
    hostvars: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// Builder
// ============================================================================

/// Builds an [`InventoryDocument`] from a [`CacheDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryBuilder;

impl InventoryBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }

    /// Group every addressable node of the snapshot.
    ///
    /// Nodes without `automatic.ipaddress` are skipped before their record is
    /// decoded. Fails on the first malformed run-list entry or invalid record;
    /// no partial inventory is returned.
    pub fn build(&self, cache: &CacheDocument) -> Result<InventoryDocument> {
        let mut inventory = InventoryDocument::new();
        let mut skipped = 0usize;

        for (name, record) in cache.iter() {
            if !has_address(record) {
                debug!(node = name, "skipping node without ipaddress");
                skipped += 1;
                continue;
            }
            let node = RawNode::from_record(name, record)?;
            self.add_node(&mut inventory, name, &node)?;
        }

        info!(
            nodes = cache.len(),
            skipped,
            groups = inventory.group_count(),
            "built inventory"
        );
        Ok(inventory)
    }

    /// Add one node's memberships; a node without an address adds none.
    fn add_node(
        &self,
        inventory: &mut InventoryDocument,
        name: &str,
        node: &RawNode,
    ) -> Result<()> {
        let Some(ip) = node.ipaddress() else {
            return Ok(());
        };

        for group in Self::node_groups(name, node)? {
            inventory.add_member(group, ip);
        }
        Ok(())
    }

    /// All group names a node belongs to, duplicates included.
    pub fn node_groups(name: &str, node: &RawNode) -> Result<Vec<String>> {
        let mut groups = vec![prefixed(ENVIRONMENT_PREFIX, node.environment())];

        groups.extend(node.roles().iter().map(|r| prefixed(ROLE_PREFIX, r)));
        groups.extend(node.recipes().iter().map(|r| prefixed(RECIPE_PREFIX, r)));
        groups.extend(node.tags().iter().map(|t| prefixed(TAG_PREFIX, t)));

        for item in node.run_list() {
            let entry = RunListEntry::parse(item).ok_or_else(|| Error::MalformedRunListEntry {
                node: name.to_string(),
                entry: item.clone(),
            })?;
            groups.push(format!(
                "{}_{}",
                sanitize_group_name(entry.kind.as_str()),
                sanitize_group_name(entry.identifier)
            ));
        }

        Ok(groups)
    }
}

fn has_address(record: &Value) -> bool {
    record
        .pointer("/automatic/ipaddress")
        .map_or(false, |ip| !ip.is_null())
}

fn prefixed(prefix: &str, value: &str) -> String {
    format!("{}_{}", prefix, sanitize_group_name(value))
}
