//! Chef server access.
//!
//! [`ChefServerClient`] implements [`NodeDirectory`](crate::inventory::NodeDirectory)
//! on top of the REST API, authenticating every request with
//! [`RequestSigner`]. Credentials can be read from knife configuration files
//! through [`KnifeConfig`].

pub mod auth;
pub mod client;
pub mod knife;

pub use auth::{RequestSigner, SigningError};
pub use client::{ChefClientConfig, ChefServerClient};
pub use knife::KnifeConfig;
