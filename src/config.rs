// src/config.rs

//! Runtime configuration
//!
//! Read from `--config <file>` or `$XDG_CONFIG_HOME/asicdoc/config.toml`.
//! Every section and field is optional:
//!
//! ```toml
//! [ssl]
//! enabled = true
//! truststore_path = "/etc/asicdoc/ca.pem"
//! protocols = ["TLSv1.2", "TLSv1.3"]
//!
//! [proxy]
//! enabled = true
//! https_host = "proxy.example.com"
//! https_port = 3128
//!
//! [validation]
//! trust_list = "https://trust.example.com/asicdoc.toml"
//!
//! [signature]
//! digest_algorithm = "SHA384"
//! ```

use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for failed downloads
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub ssl: SslSettings,
    pub proxy: ProxySettings,
    pub validation: ValidationSettings,
    pub signature: SignatureSettings,
    pub network: NetworkSettings,
}

/// TLS client settings for network fetches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SslSettings {
    pub enabled: bool,
    pub keystore_path: Option<String>,
    pub keystore_type: Option<String>,
    pub keystore_password: Option<String>,
    pub truststore_path: Option<String>,
    pub truststore_type: Option<String>,
    pub truststore_password: Option<String>,
    /// Allowed protocol versions, e.g. `TLSv1.2`
    pub protocols: Option<Vec<String>>,
    pub cipher_suites: Option<Vec<String>>,
}

/// HTTP/HTTPS proxy settings; user and password apply to both schemes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub enabled: bool,
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub https_host: Option<String>,
    pub https_port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Signature validation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Trust list location (path or http(s) URL)
    pub trust_list: Option<String>,
    /// Additional trusted signer keys (base64)
    pub trusted_keys: Vec<String>,
    pub allow_unsigned: bool,
    /// Maximum signature age in seconds (0 = no limit)
    pub max_signature_age: u64,
}

/// Defaults for new signatures
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureSettings {
    pub digest_algorithm: Option<String>,
}

/// Network client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl NetworkSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Configuration {
    /// Default configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("asicdoc").join("config.toml"))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one the default location is
    /// used when present, otherwise built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(Error::ConfigurationError(format!(
                        "Configuration file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| {
            Error::ConfigurationError(format!(
                "Failed to read configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::ConfigurationError(format!("Invalid configuration: {}", e)))
    }

    /// Default digest algorithm for new signatures
    pub fn signature_digest_algorithm(&self) -> DigestAlgorithm {
        DigestAlgorithm::parse_or_default(self.signature.digest_algorithm.as_deref())
    }
}
