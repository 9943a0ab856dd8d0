//! Shared test utilities and fixtures for the chef-inventory test suite.
//!
//! This module provides:
//! - An in-memory [`NodeDirectory`] that counts fetches
//! - Builders for raw node records
//! - Temporary cache directories
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use chef_inventory::inventory::{CacheDocument, CacheStore, NodeDirectory};
use chef_inventory::{Error, Result};

/// Path of the RSA key fixture
pub fn client_key_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("client.pem")
}

// ============================================================================
// Node fixtures
// ============================================================================

/// Fluent builder for raw node records
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    record: Value,
}

impl NodeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            record: json!({"name": name, "json_class": "Chef::Node"}),
        }
    }

    pub fn environment(mut self, env: &str) -> Self {
        self.record["chef_environment"] = json!(env);
        self
    }

    pub fn ip(mut self, ip: &str) -> Self {
        self.automatic()["ipaddress"] = json!(ip);
        self
    }

    pub fn roles(mut self, roles: &[&str]) -> Self {
        self.automatic()["roles"] = json!(roles);
        self
    }

    pub fn recipes(mut self, recipes: &[&str]) -> Self {
        self.automatic()["expanded_run_list"] = json!(recipes);
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        if self.record.get("normal").is_none() {
            self.record["normal"] = json!({});
        }
        self.record["normal"]["tags"] = json!(tags);
        self
    }

    pub fn run_list(mut self, entries: &[&str]) -> Self {
        self.record["run_list"] = json!(entries);
        self
    }

    fn automatic(&mut self) -> &mut Value {
        if self.record.get("automatic").is_none() {
            self.record["automatic"] = json!({});
        }
        &mut self.record["automatic"]
    }

    pub fn build(self) -> Value {
        self.record
    }
}

/// Build a cache document from node records, keyed by their `name`
pub fn cache_of(nodes: Vec<Value>) -> CacheDocument {
    nodes
        .into_iter()
        .map(|node| {
            let name = node["name"].as_str().unwrap_or_default().to_string();
            (name, node)
        })
        .collect()
}

/// The two-node example used throughout the docs
pub fn sample_cache() -> CacheDocument {
    cache_of(vec![
        NodeBuilder::new("web01")
            .environment("prod")
            .ip("10.0.0.1")
            .roles(&["web"])
            .recipes(&["nginx::default"])
            .tags(&["edge node"])
            .run_list(&["role[web]", "recipe[base]"])
            .build(),
        NodeBuilder::new("db01")
            .environment("prod")
            .ip("10.0.0.2")
            .roles(&["db"])
            .run_list(&["role[db]"])
            .build(),
    ])
}

// ============================================================================
// Mock directory
// ============================================================================

/// In-memory node directory that records how often it was asked
#[derive(Debug, Clone)]
pub struct MockDirectory {
    nodes: CacheDocument,
    fail: bool,
    fetches: Arc<AtomicU32>,
}

impl MockDirectory {
    pub fn new(nodes: CacheDocument) -> Self {
        Self {
            nodes,
            fail: false,
            fetches: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A directory whose every fetch fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(CacheDocument::new())
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl NodeDirectory for MockDirectory {
    fn describe(&self) -> String {
        "mock://chef".to_string()
    }

    fn fetch_all(&self) -> Result<CacheDocument> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::remote("mock://chef", "connection refused"));
        }
        Ok(self.nodes.clone())
    }
}

// ============================================================================
// Cache helpers
// ============================================================================

/// Temporary cache directory with a store using the default max age
pub struct TestCache {
    pub dir: TempDir,
    pub store: CacheStore,
}

impl TestCache {
    pub fn new() -> Self {
        Self::with_max_age(Duration::from_secs(3600))
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let store = CacheStore::in_directory(dir.path(), max_age);
        Self { dir, store }
    }
}
