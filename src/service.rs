//! Per-invocation inventory flow.
//!
//! ```text
//! Start ──(refresh requested or cache stale)──> Refreshing ──> Ready ──> Done
//!   └──────────────(cache fresh)─────────────────────────────────┘
//! ```
//!
//! A failed refresh is fatal and leaves the existing cache file untouched.

use std::time::SystemTime;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::InventoryConfig;
use crate::error::Result;
use crate::inventory::{CacheStore, InventoryBuilder, InventoryDocument, NodeDirectory};

/// What the caller asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    /// Emit the whole inventory
    List,
    /// Emit the variables of one host
    Host(String),
    /// Neither; show usage
    Usage,
}

/// One invocation's request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryRequest {
    /// Requested action
    pub action: InventoryAction,
    /// Refresh the cache even if it is fresh
    pub refresh_cache: bool,
}

impl InventoryRequest {
    /// Create a request
    pub fn new(action: InventoryAction) -> Self {
        Self {
            action,
            refresh_cache: false,
        }
    }

    /// Force a cache refresh
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh_cache = refresh;
        self
    }
}

/// Whether the cache was reused or rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// The existing snapshot was fresh
    Fresh,
    /// The snapshot was fetched from the directory
    Refreshed,
}

/// Result of a request
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryResponse {
    /// Grouped inventory for `--list`
    Inventory(InventoryDocument),
    /// Host variables for `--host`, always empty
    HostVars(Map<String, Value>),
    /// No action was requested
    Usage,
}

/// Ties the cache to a node directory.
#[derive(Debug)]
pub struct InventoryService<D> {
    store: CacheStore,
    directory: D,
    builder: InventoryBuilder,
}

impl<D: NodeDirectory> InventoryService<D> {
    /// Create a service from resolved configuration
    pub fn new(config: &InventoryConfig, directory: D) -> Self {
        let store = CacheStore::new(config.cache_path.clone(), config.cache_max_age);
        Self::with_store(store, directory)
    }

    /// Create a service around an existing store
    pub fn with_store(store: CacheStore, directory: D) -> Self {
        Self {
            store,
            directory,
            builder: InventoryBuilder::new(),
        }
    }

    /// The cache store
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Refresh the cache if `force` is set or it is stale at `now`.
    pub fn ensure_fresh(&self, force: bool, now: SystemTime) -> Result<CacheState> {
        if !force && self.store.is_valid(now) {
            debug!(path = %self.store.path().display(), "using cached nodes");
            return Ok(CacheState::Fresh);
        }
        self.refresh()?;
        Ok(CacheState::Refreshed)
    }

    /// Fetch every node and replace the cache.
    pub fn refresh(&self) -> Result<()> {
        let nodes = self.directory.fetch_all()?;
        self.store.write(&nodes)?;
        info!(
            nodes = nodes.len(),
            source = %self.directory.describe(),
            "cache refreshed"
        );
        Ok(())
    }

    /// Build the inventory from the cache
    pub fn list(&self) -> Result<InventoryDocument> {
        let nodes = self.store.read()?;
        self.builder.build(&nodes)
    }

    /// Handle a request using the current time
    pub fn run(&self, request: &InventoryRequest) -> Result<(CacheState, InventoryResponse)> {
        self.run_at(request, SystemTime::now())
    }

    /// Handle a request as of `now`
    pub fn run_at(
        &self,
        request: &InventoryRequest,
        now: SystemTime,
    ) -> Result<(CacheState, InventoryResponse)> {
        let state = self.ensure_fresh(request.refresh_cache, now)?;

        let response = match &request.action {
            InventoryAction::List => InventoryResponse::Inventory(self.list()?),
            InventoryAction::Host(name) => {
                debug!(host = %name, "host variables requested");
                InventoryResponse::HostVars(Map::new())
            }
            InventoryAction::Usage => InventoryResponse::Usage,
        };

        Ok((state, response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::inventory::CacheDocument;
    use serde_json::json;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Default)]
    struct CountingDirectory {
        calls: Cell<usize>,
        fail: bool,
    }

    impl NodeDirectory for CountingDirectory {
        fn describe(&self) -> String {
            "memory".to_string()
        }

        fn fetch_all(&self) -> Result<CacheDocument> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::remote("memory", "unreachable"));
            }
            Ok(serde_json::from_value(json!({
                "web01": {
                    "chef_environment": "prod",
                    "automatic": {"ipaddress": "10.0.0.1", "roles": ["web"]}
                }
            }))
            .unwrap())
        }
    }

    fn service(dir: &TempDir, directory: CountingDirectory) -> InventoryService<CountingDirectory> {
        let store = CacheStore::in_directory(dir.path(), Duration::from_secs(3600));
        InventoryService::with_store(store, directory)
    }

    #[test]
    fn test_missing_cache_triggers_refresh() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, CountingDirectory::default());

        let (state, response) = svc
            .run(&InventoryRequest::new(InventoryAction::List))
            .unwrap();

        assert_eq!(state, CacheState::Refreshed);
        assert_eq!(svc.directory.calls.get(), 1);
        match response {
            InventoryResponse::Inventory(doc) => assert!(doc.has_group("role_web")),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_fresh_cache_is_reused() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, CountingDirectory::default());
        svc.refresh().unwrap();

        let (state, _) = svc
            .run(&InventoryRequest::new(InventoryAction::List))
            .unwrap();

        assert_eq!(state, CacheState::Fresh);
        assert_eq!(svc.directory.calls.get(), 1);
    }

    #[test]
    fn test_forced_refresh() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir, CountingDirectory::default());
        svc.refresh().unwrap();

        let request =
            InventoryRequest::new(InventoryAction::Host("web01".into())).with_refresh(true);
        let (state, response) = svc.run(&request).unwrap();

        assert_eq!(state, CacheState::Refreshed);
        assert_eq!(svc.directory.calls.get(), 2);
        assert_eq!(response, InventoryResponse::HostVars(Map::new()));
    }

    #[test]
    fn test_failed_fetch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let svc = service(
            &dir,
            CountingDirectory {
                fail: true,
                ..Default::default()
            },
        );

        let err = svc
            .run(&InventoryRequest::new(InventoryAction::Usage))
            .unwrap_err();
        assert!(err.is_remote());
        assert!(!svc.store().path().exists());
    }
}
