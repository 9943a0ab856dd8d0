//! Configuration for chef-inventory
//!
//! Everything an invocation needs is resolved once at startup into an
//! [`InventoryConfig`]:
//! - Settings file (INI, `[chef]` section), by default `chef.ini` next to the executable
//! - Chef credentials, from the settings file, a knife.rb, or the environment
//! - Cache location and max age
//!
//! ```ini
//! [chef]
//! cache_path = ~/.cache/ansible
//! cache_max_age = 3600
//! chef_timeout = 60
//! chef_server_url = https://chef.example.com/organizations/acme
//! client_name = ansible
//! client_key = ~/.chef/ansible.pem
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{File, FileFormat};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::chef::knife::KnifeConfig;
use crate::error::{Error, Result};
use crate::inventory::{CACHE_FILE_NAME, DEFAULT_CACHE_MAX_AGE};

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "chef.ini";

/// Environment variable holding the server URL
pub const ENV_SERVER_URL: &str = "CHEF_SERVER_URL";
/// Environment variable holding the client name
pub const ENV_USER: &str = "CHEF_USER";
/// Environment variable holding the client key path
pub const ENV_PEMFILE: &str = "CHEF_PEMFILE";

/// Default HTTP timeout for the node search
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Settings File
// ============================================================================

/// Raw `[chef]` section; INI values are always strings.
#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    chef: ChefSection,
}

#[derive(Debug, Default, Deserialize)]
struct ChefSection {
    cache_path: Option<String>,
    cache_max_age: Option<String>,
    chef_timeout: Option<String>,
    chef_server_url: Option<String>,
    client_key: Option<String>,
    client_name: Option<String>,
}

/// Options read from the settings file. Every option is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// File the settings came from, if it existed
    pub source: Option<PathBuf>,
    /// Directory holding the cache file
    pub cache_path: Option<PathBuf>,
    /// Cache freshness threshold
    pub cache_max_age: Option<Duration>,
    /// HTTP timeout
    pub timeout: Option<Duration>,
    /// Chef server URL
    pub chef_server_url: Option<String>,
    /// Client key path
    pub client_key: Option<PathBuf>,
    /// Client name
    pub client_name: Option<String>,
}

impl Settings {
    /// Load settings from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        let source = File::from(path).format(FileFormat::Ini).required(false);
        let mut settings = Self::from_source(source, &path.display().to_string())?;
        if path.is_file() {
            settings.source = Some(path.to_path_buf());
        }
        debug!(path = %path.display(), found = settings.source.is_some(), "loaded settings");
        Ok(settings)
    }

    /// Parse settings from INI text
    pub fn from_ini_str(content: &str) -> Result<Self> {
        Self::from_source(File::from_str(content, FileFormat::Ini), "<string>")
    }

    fn from_source<S>(source: S, origin: &str) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let raw: SettingsFile = config::Config::builder()
            .add_source(source)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| Error::invalid_setting(origin, e.to_string()))?;
        let chef = raw.chef;

        Ok(Self {
            source: None,
            cache_path: non_empty(chef.cache_path).map(|p| expand_path(&p)),
            cache_max_age: parse_seconds("cache_max_age", chef.cache_max_age)?,
            timeout: parse_seconds("chef_timeout", chef.chef_timeout)?,
            chef_server_url: non_empty(chef.chef_server_url),
            client_key: non_empty(chef.client_key).map(|p| expand_path(&p)),
            client_name: non_empty(chef.client_name),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn parse_seconds(key: &str, value: Option<String>) -> Result<Option<Duration>> {
    match non_empty(value) {
        None => Ok(None),
        Some(v) => v
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| {
                Error::invalid_setting(
                    key,
                    format!("expected a non-negative integer, got '{}'", v),
                )
            }),
    }
}

/// Default settings file location: `chef.ini` next to the running executable.
pub fn default_settings_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(SETTINGS_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME))
}

// ============================================================================
// Credentials
// ============================================================================

/// Where a set of credentials was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// The `[chef]` section of the settings file
    SettingsFile,
    /// A knife.rb or client.rb
    Knife(PathBuf),
    /// `CHEF_SERVER_URL`, `CHEF_USER` and `CHEF_PEMFILE`
    Environment,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::SettingsFile => write!(f, "settings file"),
            CredentialSource::Knife(path) => write!(f, "{}", path.display()),
            CredentialSource::Environment => write!(f, "environment"),
        }
    }
}

/// Everything needed to authenticate against the Chef server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Server URL, including the organization path if any
    pub server_url: String,
    /// Path to the client's private key
    pub client_key: PathBuf,
    /// API client name
    pub client_name: String,
    /// Where these came from
    pub source: CredentialSource,
}

impl Credentials {
    fn new(
        server_url: String,
        client_key: PathBuf,
        client_name: String,
        source: CredentialSource,
    ) -> Result<Self> {
        Url::parse(&server_url).map_err(|e| {
            Error::invalid_setting("chef_server_url", format!("{}: {}", server_url, e))
        })?;
        Ok(Self {
            server_url,
            client_key,
            client_name,
            source,
        })
    }
}

/// Resolve credentials: all three settings-file values, then the first knife
/// configuration among `knife_paths`, then the environment through `env`.
pub fn resolve_credentials<F>(
    settings: &Settings,
    knife_paths: &[PathBuf],
    env: F,
) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    if let (Some(url), Some(key), Some(name)) = (
        &settings.chef_server_url,
        &settings.client_key,
        &settings.client_name,
    ) {
        return Credentials::new(
            url.clone(),
            key.clone(),
            name.clone(),
            CredentialSource::SettingsFile,
        );
    }

    if let Some(knife) = KnifeConfig::discover(knife_paths) {
        if !knife.is_complete() {
            debug!(path = %knife.source.display(), "knife configuration is incomplete");
        } else if let KnifeConfig {
            source,
            chef_server_url: Some(url),
            node_name: Some(name),
            client_key: Some(key),
        } = knife
        {
            return Credentials::new(url, key, name, CredentialSource::Knife(source));
        }
    }

    let url = env(ENV_SERVER_URL).filter(|v| !v.is_empty());
    let name = env(ENV_USER).filter(|v| !v.is_empty());
    let key = env(ENV_PEMFILE).filter(|v| !v.is_empty());

    match (url, key, name) {
        (Some(url), Some(key), Some(name)) => Credentials::new(
            url,
            expand_path(&key),
            name,
            CredentialSource::Environment,
        ),
        (url, key, name) => {
            let missing = [
                (url.is_none(), ENV_SERVER_URL),
                (name.is_none(), ENV_USER),
                (key.is_none(), ENV_PEMFILE),
            ]
            .iter()
            .filter(|(absent, _)| *absent)
            .map(|(_, var)| *var)
            .collect::<Vec<_>>()
            .join(", ");
            Err(Error::ConfigurationMissing { missing })
        }
    }
}

// ============================================================================
// Inventory Configuration
// ============================================================================

/// Fully resolved configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Cache file path
    pub cache_path: PathBuf,
    /// Cache freshness threshold
    pub cache_max_age: Duration,
    /// HTTP timeout for the node search
    pub timeout: Duration,
    /// Chef credentials
    pub credentials: Credentials,
}

impl InventoryConfig {
    /// Load from the settings file at `settings_path` and the process
    /// environment.
    pub fn load(settings_path: &Path) -> Result<Self> {
        let settings = Settings::load(settings_path)?;
        let home = dirs::home_dir();
        let cwd = std::env::current_dir().ok();
        let knife_home = std::env::var_os("KNIFE_HOME").map(PathBuf::from);

        let knife_paths =
            KnifeConfig::search_paths(knife_home.as_deref(), cwd.as_deref(), home.as_deref());
        let credentials =
            resolve_credentials(&settings, &knife_paths, |key| std::env::var(key).ok())?;
        debug!(
            source = %credentials.source,
            server = %credentials.server_url,
            "resolved credentials"
        );

        Ok(Self::from_parts(&settings, credentials, home.as_deref()))
    }

    /// Combine settings and credentials, filling in defaults
    pub fn from_parts(settings: &Settings, credentials: Credentials, home: Option<&Path>) -> Self {
        let cache_path = match &settings.cache_path {
            Some(dir) => dir.join(CACHE_FILE_NAME),
            None => home
                .unwrap_or_else(|| Path::new("."))
                .join(format!(".{}", CACHE_FILE_NAME)),
        };

        Self {
            cache_path,
            cache_max_age: settings.cache_max_age.unwrap_or(DEFAULT_CACHE_MAX_AGE),
            timeout: settings.timeout.unwrap_or(DEFAULT_TIMEOUT),
            credentials,
        }
    }
}
