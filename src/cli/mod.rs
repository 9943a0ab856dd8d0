//! CLI module for chef-inventory
//!
//! Implements the Ansible dynamic inventory script protocol: `--list` and
//! `--host <name>`, plus cache and logging controls.

use clap::Parser;
use std::path::PathBuf;

use chef_inventory::service::{InventoryAction, InventoryRequest};

/// Ansible dynamic inventory backed by a Chef server
///
/// Groups nodes by environment, role, recipe and tag. Node data is cached
/// locally and refreshed once the cache is older than `cache_max_age`.
#[derive(Parser, Debug, Clone)]
#[command(name = "chef-inventory")]
#[command(author = "Rustible Contributors")]
#[command(version)]
#[command(about = "Ansible dynamic inventory backed by a Chef server", long_about = None)]
pub struct Cli {
    /// List all groups and their hosts
    #[arg(long)]
    pub list: bool,

    /// Get all the variables about a specific host
    #[arg(long, value_name = "HOSTNAME")]
    pub host: Option<String>,

    /// Force refresh of the cache by making API requests to the Chef server
    #[arg(long = "refresh-cache")]
    pub refresh_cache: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the settings file (defaults to chef.ini next to the executable)
    #[arg(long, env = "CHEF_INI_PATH", value_name = "PATH")]
    pub settings: Option<PathBuf>,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }

    /// The requested action; `--list` wins over `--host`
    pub fn action(&self) -> InventoryAction {
        if self.list {
            InventoryAction::List
        } else if let Some(host) = &self.host {
            InventoryAction::Host(host.clone())
        } else {
            InventoryAction::Usage
        }
    }

    /// Build the service request
    pub fn request(&self) -> InventoryRequest {
        InventoryRequest::new(self.action()).with_refresh(self.refresh_cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list() {
        let cli = Cli::try_parse_from(["chef-inventory", "--list"]).unwrap();
        assert_eq!(cli.action(), InventoryAction::List);
        assert!(!cli.request().refresh_cache);
    }

    #[test]
    fn test_host_with_refresh() {
        let cli =
            Cli::try_parse_from(["chef-inventory", "--host", "web01", "--refresh-cache"]).unwrap();
        let request = cli.request();
        assert_eq!(request.action, InventoryAction::Host("web01".to_string()));
        assert!(request.refresh_cache);
    }

    #[test]
    fn test_list_takes_precedence() {
        let cli = Cli::try_parse_from(["chef-inventory", "--host", "web01", "--list"]).unwrap();
        assert_eq!(cli.action(), InventoryAction::List);
    }

    #[test]
    fn test_no_action_is_usage() {
        let cli = Cli::try_parse_from(["chef-inventory"]).unwrap();
        assert_eq!(cli.action(), InventoryAction::Usage);
    }

    #[test]
    fn test_verbosity() {
        let cli = Cli::try_parse_from(["chef-inventory", "-vvvv", "--list"]).unwrap();
        assert_eq!(cli.verbosity(), 3);
    }
}
