//! Chef server request signing (signed header authentication, version 1.0).
//!
//! Every API request carries the client name, a timestamp, a SHA-1 hash of
//! the body and an RSA signature over a canonical description of the request:
//!
//! ```text
//! Method:GET
//! Hashed Path:<base64(sha1(path))>
//! X-Ops-Content-Hash:<base64(sha1(body))>
//! X-Ops-Timestamp:2024-01-15T10:30:00Z
//! X-Ops-Userid:<client name>
//! ```
//!
//! The signature is PKCS#1 v1.5 padded with the client key without a digest
//! prefix, base64 encoded and split across `X-Ops-Authorization-N` headers of
//! at most 60 characters.

use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Value of the `X-Ops-Sign` header
pub const SIGN_DESCRIPTION: &str = "algorithm=sha1;version=1.0;";

/// Maximum length of one `X-Ops-Authorization-N` header value
const AUTHORIZATION_CHUNK: usize = 60;

/// Errors that can occur while preparing signed requests
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("failed to read client key '{path}': {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client key is not a PEM encoded RSA private key")]
    KeyFormat,

    #[error("failed to sign request: {0}")]
    Sign(#[from] rsa::Error),
}

/// Signs Chef API requests on behalf of one client.
pub struct RequestSigner {
    client_name: String,
    key: RsaPrivateKey,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("client_name", &self.client_name)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer from an already decoded key
    pub fn new(client_name: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            client_name: client_name.into(),
            key,
        }
    }

    /// Create a signer from a PKCS#1 or PKCS#8 PEM document
    pub fn from_pem(client_name: impl Into<String>, pem: &str) -> Result<Self, SigningError> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(pem))
            .map_err(|_| SigningError::KeyFormat)?;
        Ok(Self::new(client_name, key))
    }

    /// Create a signer from a PEM key file
    pub fn from_key_file(
        client_name: impl Into<String>,
        path: &Path,
    ) -> Result<Self, SigningError> {
        let pem = std::fs::read_to_string(path).map_err(|source| SigningError::KeyRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pem(client_name, &pem)
    }

    /// Client name sent as `X-Ops-Userid`
    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Produce the authentication headers for one request.
    pub fn sign(
        &self,
        method: &str,
        path: &str,
        body: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, SigningError> {
        let timestamp = format_timestamp(timestamp);
        let content_hash = digest(body);
        let canonical = canonical_request(
            method,
            &digest(canonical_path(path).as_bytes()),
            &content_hash,
            &timestamp,
            &self.client_name,
        );

        let signature = self
            .key
            .sign(Pkcs1v15Sign::new_unprefixed(), canonical.as_bytes())?;
        let encoded = STANDARD.encode(signature);

        let mut headers = vec![
            ("X-Ops-Sign".to_string(), SIGN_DESCRIPTION.to_string()),
            ("X-Ops-Userid".to_string(), self.client_name.clone()),
            ("X-Ops-Timestamp".to_string(), timestamp),
            ("X-Ops-Content-Hash".to_string(), content_hash),
        ];
        headers.extend(
            encoded
                .as_bytes()
                .chunks(AUTHORIZATION_CHUNK)
                .enumerate()
                .map(|(i, chunk)| {
                    (
                        format!("X-Ops-Authorization-{}", i + 1),
                        String::from_utf8_lossy(chunk).into_owned(),
                    )
                }),
        );
        Ok(headers)
    }
}

/// The string that gets signed
pub fn canonical_request(
    method: &str,
    hashed_path: &str,
    content_hash: &str,
    timestamp: &str,
    user_id: &str,
) -> String {
    format!(
        "Method:{}\nHashed Path:{}\nX-Ops-Content-Hash:{}\nX-Ops-Timestamp:{}\nX-Ops-Userid:{}",
        method.to_ascii_uppercase(),
        hashed_path,
        content_hash,
        timestamp,
        user_id
    )
}

/// Squeeze repeated slashes and drop a trailing slash
pub fn canonical_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch == '/' && result.ends_with('/') {
            continue;
        }
        result.push(ch);
    }
    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

/// ISO 8601 UTC timestamp with second precision
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Base64 encoded SHA-1 digest
fn digest(bytes: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(bytes))
}
