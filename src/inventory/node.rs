//! Node records as returned by the Chef server.
//!
//! The cache keeps every record verbatim as JSON so that it mirrors the last
//! search exactly. [`RawNode`] is the narrow, typed view of a record that the
//! grouping algorithm needs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Environment Chef assigns to nodes that were never put in one.
pub const DEFAULT_ENVIRONMENT: &str = "_default";

static RUN_LIST_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(role|recipe)\[(.*)\]$").expect("valid run_list regex"));

// ============================================================================
// Cache Document
// ============================================================================

/// Snapshot of all nodes, keyed by node name.
///
/// Serializes as a plain JSON object with sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheDocument {
    nodes: BTreeMap<String, serde_json::Value>,
}

impl CacheDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw node record, returning the previous record for that name
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        record: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.nodes.insert(name.into(), record)
    }

    /// Get the raw record of a node
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.nodes.get(name)
    }

    /// Number of nodes in the snapshot
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the snapshot holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over `(name, record)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.nodes.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Node names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}

impl FromIterator<(String, serde_json::Value)> for CacheDocument {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Raw Node
// ============================================================================

/// Typed view of the node fields used for grouping.
///
/// Every field is optional: an absent or `null` list reads as empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawNode {
    /// Node name as stored in the record
    #[serde(default)]
    pub name: Option<String>,

    /// Deployment environment
    #[serde(default)]
    pub chef_environment: Option<String>,

    /// Attributes discovered by ohai on the node
    #[serde(default)]
    pub automatic: Option<AutomaticAttributes>,

    /// Attributes persisted on the node object
    #[serde(default)]
    pub normal: Option<NormalAttributes>,

    /// Explicit run-list (`role[...]` / `recipe[...]`)
    #[serde(default)]
    pub run_list: Option<Vec<String>>,
}

/// The `automatic` attribute subset used for grouping
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AutomaticAttributes {
    /// Routable address of the node
    #[serde(default)]
    pub ipaddress: Option<String>,

    /// Roles expanded from the run-list
    #[serde(default)]
    pub roles: Option<Vec<String>>,

    /// Recipes expanded from the run-list
    #[serde(default)]
    pub expanded_run_list: Option<Vec<String>>,
}

/// The `normal` attribute subset used for grouping
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NormalAttributes {
    /// Free-form node tags
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl RawNode {
    /// Decode the grouping view of a cached record.
    pub fn from_record(name: &str, record: &serde_json::Value) -> Result<Self> {
        if !record.is_object() {
            return Err(Error::InvalidNodeRecord {
                node: name.to_string(),
                message: format!("expected a JSON object, found {}", json_kind(record)),
            });
        }

        RawNode::deserialize(record).map_err(|e| Error::InvalidNodeRecord {
            node: name.to_string(),
            message: e.to_string(),
        })
    }

    /// The node's address, if ohai reported one
    pub fn ipaddress(&self) -> Option<&str> {
        self.automatic
            .as_ref()
            .and_then(|a| a.ipaddress.as_deref())
    }

    /// The node's environment, `_default` when unset
    pub fn environment(&self) -> &str {
        self.chef_environment
            .as_deref()
            .unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// Expanded roles (empty when absent)
    pub fn roles(&self) -> &[String] {
        self.automatic
            .as_ref()
            .and_then(|a| a.roles.as_deref())
            .unwrap_or_default()
    }

    /// Expanded recipes (empty when absent)
    pub fn recipes(&self) -> &[String] {
        self.automatic
            .as_ref()
            .and_then(|a| a.expanded_run_list.as_deref())
            .unwrap_or_default()
    }

    /// Node tags (empty when absent)
    pub fn tags(&self) -> &[String] {
        self.normal
            .as_ref()
            .and_then(|n| n.tags.as_deref())
            .unwrap_or_default()
    }

    /// Raw run-list entries (empty when absent)
    pub fn run_list(&self) -> &[String] {
        self.run_list.as_deref().unwrap_or_default()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

// ============================================================================
// Run-list Entries
// ============================================================================

/// Kind of a run-list directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunListKind {
    /// `role[...]`
    Role,
    /// `recipe[...]`
    Recipe,
}

impl RunListKind {
    /// The keyword as written in the run-list
    pub fn as_str(&self) -> &'static str {
        match self {
            RunListKind::Role => "role",
            RunListKind::Recipe => "recipe",
        }
    }
}

impl fmt::Display for RunListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `kind[identifier]` run-list entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunListEntry<'a> {
    /// Directive kind
    pub kind: RunListKind,
    /// Text between the brackets
    pub identifier: &'a str,
}

impl<'a> RunListEntry<'a> {
    /// Parse an entry, returning `None` if it does not match `kind[identifier]`.
    pub fn parse(entry: &'a str) -> Option<Self> {
        let caps = RUN_LIST_ENTRY.captures(entry)?;
        let kind = match caps.get(1)?.as_str() {
            "role" => RunListKind::Role,
            "recipe" => RunListKind::Recipe,
            _ => return None,
        };
        let identifier = caps.get(2)?.as_str();
        Some(Self { kind, identifier })
    }
}
