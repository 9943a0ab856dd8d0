//! # chef-inventory - Ansible dynamic inventory from a Chef server
//!
//! Queries a Chef server for every registered node and renders the result as
//! an Ansible dynamic inventory (`--list` JSON protocol). Since the inventory
//! is requested once per playbook run, all nodes are kept in a local JSON
//! snapshot that is only refreshed once it is older than a configured max age.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CLI (--list, --host)                    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      InventoryService                        │
//! │           (refresh if stale, then build from cache)          │
//! └──────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────┐
//! │  NodeDirectory  │  │   CacheStore    │  │  InventoryBuilder   │
//! │ (Chef REST API) │  │ (JSON snapshot) │  │ (groups + _meta)    │
//! └─────────────────┘  └─────────────────┘  └─────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use chef_inventory::chef::{ChefClientConfig, ChefServerClient};
//! use chef_inventory::config::{default_settings_path, InventoryConfig};
//! use chef_inventory::service::{
//!     InventoryAction, InventoryRequest, InventoryResponse, InventoryService,
//! };
//!
//! fn main() -> chef_inventory::Result<()> {
//!     let config = InventoryConfig::load(&default_settings_path())?;
//!     let client = ChefServerClient::new(
//!         ChefClientConfig::from_credentials(&config.credentials).with_timeout(config.timeout),
//!     );
//!     let service = InventoryService::new(&config, client);
//!
//!     let request = InventoryRequest::new(InventoryAction::List);
//!     if let (_, InventoryResponse::Inventory(inventory)) = service.run(&request)? {
//!         println!("{}", inventory.to_pretty_json().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod chef;
pub mod config;
pub mod error;
pub mod inventory;
pub mod service;

pub use error::{Error, Result};

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.
    pub use crate::chef::{ChefClientConfig, ChefServerClient};
    pub use crate::config::{InventoryConfig, Settings};
    pub use crate::error::{Error, Result};
    pub use crate::inventory::{
        CacheDocument, CacheStore, InventoryBuilder, InventoryDocument, NodeDirectory,
    };
    pub use crate::service::{
        CacheState, InventoryAction, InventoryRequest, InventoryResponse, InventoryService,
    };
}
