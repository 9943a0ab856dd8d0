//! The remote source of node records.

use std::fmt;

use super::node::CacheDocument;
use crate::error::Result;

/// A directory service that can list every registered node.
///
/// Implementations return the complete set of raw node records keyed by node
/// name, or an error; a partial result is never returned. Implementations
/// should report failures as [`Error::RemoteFetchFailed`](crate::Error::RemoteFetchFailed).
pub trait NodeDirectory: fmt::Debug {
    /// Human readable location of the directory, for diagnostics
    fn describe(&self) -> String;

    /// Fetch all nodes
    fn fetch_all(&self) -> Result<CacheDocument>;
}

impl<T: NodeDirectory + ?Sized> NodeDirectory for &T {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch_all(&self) -> Result<CacheDocument> {
        (**self).fetch_all()
    }
}

impl<T: NodeDirectory + ?Sized> NodeDirectory for Box<T> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn fetch_all(&self) -> Result<CacheDocument> {
        (**self).fetch_all()
    }
}
