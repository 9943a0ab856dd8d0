//! Inventory materialization for Chef nodes.
//!
//! - [`sanitize`]: group name sanitization
//! - [`node`]: typed view of raw node records and the cached snapshot
//! - [`cache`]: the on-disk snapshot and its freshness policy
//! - [`builder`]: grouping nodes into an inventory document
//! - [`directory`]: the source nodes are fetched from

pub mod builder;
pub mod cache;
pub mod directory;
pub mod node;
pub mod sanitize;

pub use builder::{InventoryBuilder, InventoryDocument, META_KEY};
pub use cache::{CacheStore, CACHE_FILE_NAME, DEFAULT_CACHE_MAX_AGE};
pub use directory::NodeDirectory;
pub use node::{CacheDocument, RawNode, RunListEntry, RunListKind, DEFAULT_ENVIRONMENT};
pub use sanitize::sanitize_group_name;
