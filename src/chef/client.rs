//! Chef server API client.
//!
//! Lists nodes through the search endpoint, paging through the results:
//!
//! ```text
//! GET {chef_server_url}/search/node?q=*:*&start=0&rows=1000
//! ```
//!
//! The HTTP client lives only for the duration of one [`NodeDirectory::fetch_all`]
//! call; it is built when the session opens and dropped when it closes,
//! whether the search succeeded or not.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::auth::RequestSigner;
pub use crate::config::DEFAULT_TIMEOUT;
use crate::config::Credentials;
use crate::error::{Error, Result};
use crate::inventory::{CacheDocument, NodeDirectory};

/// Number of nodes requested per search page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Chef client version advertised to the server
const CHEF_VERSION: &str = "12.0.0";

/// Configuration for the Chef server client
#[derive(Debug, Clone)]
pub struct ChefClientConfig {
    /// Server URL, including the organization path if any
    pub server_url: String,
    /// API client name
    pub client_name: String,
    /// Path to the client's PEM key
    pub client_key: PathBuf,
    /// Request timeout
    pub timeout: Duration,
    /// Rows per search page
    pub page_size: usize,
    /// User agent string
    pub user_agent: String,
}

impl ChefClientConfig {
    /// Create a configuration from resolved credentials
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            server_url: credentials.server_url.clone(),
            client_name: credentials.client_name.clone(),
            client_key: credentials.client_key.clone(),
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: format!("chef-inventory/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of rows per search page
    pub fn with_page_size(mut self, rows: usize) -> Self {
        self.page_size = rows.max(1);
        self
    }
}

/// [`NodeDirectory`] backed by the Chef server REST API
#[derive(Debug, Clone)]
pub struct ChefServerClient {
    config: ChefClientConfig,
}

/// One page of search results
#[derive(Debug, Deserialize)]
struct SearchPage {
    total: usize,
    #[serde(default)]
    rows: Vec<serde_json::Value>,
}

/// An open connection to the server, valid for one fetch
struct ChefSession<'a> {
    http: Client,
    signer: RequestSigner,
    search_url: Url,
    config: &'a ChefClientConfig,
}

impl ChefServerClient {
    /// Create a client
    pub fn new(config: ChefClientConfig) -> Self {
        Self { config }
    }

    /// Client configuration
    pub fn config(&self) -> &ChefClientConfig {
        &self.config
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::remote(&self.config.server_url, message)
    }

    /// Run `f` with an open session. The session and its HTTP connections are
    /// released when this returns.
    fn with_session<T>(&self, f: impl FnOnce(&ChefSession<'_>) -> Result<T>) -> Result<T> {
        let signer = RequestSigner::from_key_file(&self.config.client_name, &self.config.client_key)
            .map_err(|e| self.error(e.to_string()))?;

        let base = Url::parse(&self.config.server_url)
            .map_err(|e| self.error(format!("invalid server URL: {}", e)))?;
        let mut search_url = base.clone();
        search_url.set_path(&format!("{}/search/node", base.path().trim_end_matches('/')));

        let http = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| self.error(format!("failed to create HTTP client: {}", e)))?;

        let session = ChefSession {
            http,
            signer,
            search_url,
            config: &self.config,
        };
        let result = f(&session);
        drop(session);
        debug!(server = %self.config.server_url, "closed Chef server session");
        result
    }
}

impl ChefSession<'_> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::remote(&self.config.server_url, message)
    }

    fn search_page(&self, start: usize) -> Result<SearchPage> {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", "*:*")
            .append_pair("start", &start.to_string())
            .append_pair("rows", &self.config.page_size.to_string());

        let headers = self
            .signer
            .sign("GET", url.path(), b"", Utc::now())
            .map_err(|e| self.error(e.to_string()))?;

        let mut request = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .header("X-Chef-Version", CHEF_VERSION);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        debug!(%url, "searching nodes");
        let response = request
            .send()
            .map_err(|e| self.error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = body.chars().take(200).collect::<String>();
            return Err(self.error(format!("server returned {}: {}", status, detail)));
        }

        response
            .json::<SearchPage>()
            .map_err(|e| self.error(format!("malformed search response: {}", e)))
    }
}

impl NodeDirectory for ChefServerClient {
    fn describe(&self) -> String {
        self.config.server_url.clone()
    }

    fn fetch_all(&self) -> Result<CacheDocument> {
        info!(server = %self.config.server_url, "refreshing node cache, this could take a while");

        self.with_session(|session| {
            let mut doc = CacheDocument::new();
            let mut start = 0;

            loop {
                let page = session.search_page(start)?;
                let count = page.rows.len();

                for row in page.rows {
                    let name = row
                        .get("name")
                        .and_then(|n| n.as_str())
                        .map(String::from)
                        .ok_or_else(|| session.error("search returned a node without a name"))?;
                    doc.insert(name, row);
                }

                start += count;
                if count == 0 || start >= page.total {
                    break;
                }
            }

            info!(nodes = doc.len(), "fetched nodes");
            Ok(doc)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CredentialSource;

    fn credentials() -> Credentials {
        Credentials {
            server_url: "https://chef.example.com/organizations/acme".to_string(),
            client_key: PathBuf::from("/etc/chef/ansible.pem"),
            client_name: "ansible".to_string(),
            source: CredentialSource::Environment,
        }
    }

    #[test]
    fn test_from_credentials_defaults() {
        let config = ChefClientConfig::from_credentials(&credentials());

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.client_name, "ansible");
    }

    #[test]
    fn test_page_size_is_at_least_one() {
        let config = ChefClientConfig::from_credentials(&credentials())
            .with_timeout(Duration::from_secs(5))
            .with_page_size(0);

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.page_size, 1);
    }
}
