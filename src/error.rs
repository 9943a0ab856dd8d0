//! Error types for chef-inventory.
//!
//! Every fatal condition of an invocation is a variant here. Nothing in the
//! library retries; errors travel up to the binary, which maps them to a
//! process exit code with [`Error::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chef-inventory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for chef-inventory.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// No complete set of Chef credentials could be found.
    #[error(
        "no Chef server configuration found ({missing}). Set CHEF_PEMFILE, CHEF_USER and \
         CHEF_SERVER_URL environment vars, or configure chef_server_url, client_key and \
         client_name in the [chef] section of the settings file. They might be located \
         under ~/.chef/knife_local.rb or ~/.chef/knife.rb"
    )]
    ConfigurationMissing {
        /// Names of the values that could not be resolved
        missing: String,
    },

    /// The settings file or one of its values could not be understood.
    #[error("invalid setting '{key}': {message}")]
    InvalidSetting {
        /// Setting key (or file path for whole-file errors)
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Cache Errors
    // ========================================================================
    /// The cache file is missing or does not hold a node snapshot.
    #[error("cache '{path}' is unreadable: {message}")]
    CacheUnreadable {
        /// Path to the cache file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// The cache file could not be written.
    #[error("failed to write cache '{path}': {source}")]
    CacheWrite {
        /// Path to the cache file
        path: PathBuf,
        /// Source error
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Remote Errors
    // ========================================================================
    /// The node search against the Chef server failed.
    #[error("failed to fetch nodes from '{server}': {message}")]
    RemoteFetchFailed {
        /// Chef server URL
        server: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Node Data Errors
    // ========================================================================
    /// A run-list entry is not of the form `role[...]` or `recipe[...]`.
    #[error("node '{node}' has malformed run_list entry '{entry}'")]
    MalformedRunListEntry {
        /// Node name
        node: String,
        /// The offending entry
        entry: String,
    },

    /// A cached node record has a field of the wrong type.
    #[error("node '{node}' has an invalid record: {message}")]
    InvalidNodeRecord {
        /// Node name
        node: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a remote fetch error.
    pub fn remote(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteFetchFailed {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a cache read error.
    pub fn cache_unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CacheUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid setting error.
    pub fn invalid_setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ConfigurationMissing { .. } | Error::InvalidSetting { .. } => 2,
            Error::CacheUnreadable { .. } | Error::CacheWrite { .. } => 3,
            Error::RemoteFetchFailed { .. } => 4,
            Error::MalformedRunListEntry { .. } | Error::InvalidNodeRecord { .. } => 5,
        }
    }

    /// Check if this error came from talking to the Chef server.
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::RemoteFetchFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_non_zero() {
        let errors = [
            Error::ConfigurationMissing {
                missing: "CHEF_USER".to_string(),
            },
            Error::invalid_setting("cache_max_age", "not a number"),
            Error::cache_unreadable("/tmp/x", "missing"),
            Error::remote("https://chef", "401"),
            Error::MalformedRunListEntry {
                node: "n1".to_string(),
                entry: "role(web)".to_string(),
            },
        ];

        for err in &errors {
            assert_ne!(err.exit_code(), 0, "{err}");
        }
    }

    #[test]
    fn test_configuration_missing_names_env_vars() {
        let err = Error::ConfigurationMissing {
            missing: "client_key".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("CHEF_PEMFILE"));
        assert!(message.contains("CHEF_USER"));
        assert!(message.contains("CHEF_SERVER_URL"));
    }

    #[test]
    fn test_malformed_entry_message() {
        let err = Error::MalformedRunListEntry {
            node: "web01".to_string(),
            entry: "role(web)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "node 'web01' has malformed run_list entry 'role(web)'"
        );
        assert!(!err.is_remote());
    }
}
