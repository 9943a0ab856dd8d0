//! Credential discovery from knife / chef-client configuration files.
//!
//! Only the three plain assignments needed to talk to the server are read:
//!
//! ```ruby
//! current_dir = File.dirname(__FILE__)
//! node_name        "ansible"
//! client_key       "#{current_dir}/ansible.pem"
//! chef_server_url  "https://chef.example.com/organizations/acme"
//! ```
//!
//! Anything else in the file, including arbitrary Ruby, is ignored.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(chef_server_url|node_name|client_key)\s*(?:\(\s*)?(?:'([^']*)'|"([^"]*)")"#)
        .expect("valid knife assignment regex")
});

/// Credentials found in a knife.rb or client.rb
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnifeConfig {
    /// File the values were read from
    pub source: PathBuf,
    /// `chef_server_url`
    pub chef_server_url: Option<String>,
    /// `node_name`
    pub node_name: Option<String>,
    /// `client_key`
    pub client_key: Option<PathBuf>,
}

impl KnifeConfig {
    /// Parse the contents of a knife configuration file located at `source`
    pub fn parse(content: &str, source: &Path) -> Self {
        let current_dir = source
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default();

        let mut config = KnifeConfig {
            source: source.to_path_buf(),
            ..Default::default()
        };

        for line in content.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            let Some(caps) = ASSIGNMENT.captures(line) else {
                continue;
            };
            let Some(raw) = caps.get(2).or_else(|| caps.get(3)) else {
                continue;
            };
            let value = raw.as_str().replace("#{current_dir}", &current_dir);

            match &caps[1] {
                "chef_server_url" => config.chef_server_url = Some(value),
                "node_name" => config.node_name = Some(value),
                "client_key" => {
                    config.client_key = Some(PathBuf::from(shellexpand::tilde(&value).into_owned()))
                }
                _ => {}
            }
        }

        config
    }

    /// Load a configuration file, returning `None` if it cannot be read
    pub fn load(path: &Path) -> Option<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Some(Self::parse(&content, path)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "knife configuration not readable");
                None
            }
        }
    }

    /// Load the first existing file among `candidates`
    pub fn discover(candidates: &[PathBuf]) -> Option<Self> {
        candidates
            .iter()
            .filter(|path| path.is_file())
            .find_map(|path| Self::load(path))
    }

    /// Standard locations, most specific first: `$KNIFE_HOME/knife.rb`,
    /// `.chef/knife.rb` in `cwd` and each of its ancestors,
    /// `~/.chef/knife.rb`, then `/etc/chef/client.rb`.
    pub fn search_paths(
        knife_home: Option<&Path>,
        cwd: Option<&Path>,
        home: Option<&Path>,
    ) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(dir) = knife_home {
            paths.push(dir.join("knife.rb"));
        }
        if let Some(cwd) = cwd {
            paths.extend(cwd.ancestors().map(|dir| dir.join(".chef").join("knife.rb")));
        }
        if let Some(home) = home {
            let knife = home.join(".chef").join("knife.rb");
            if !paths.contains(&knife) {
                paths.push(knife);
            }
        }
        paths.push(PathBuf::from("/etc/chef/client.rb"));

        paths
    }

    /// Check if all three credentials are present
    pub fn is_complete(&self) -> bool {
        self.chef_server_url.is_some() && self.node_name.is_some() && self.client_key.is_some()
    }
}
