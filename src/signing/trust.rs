// src/signing/trust.rs
//! Signer trust policy
//!
//! The trust list is a TOML document naming trusted signer keys. It is read
//! from a local path or fetched over HTTP(S) through a [`DataLoader`].

use crate::config::ValidationSettings;
use crate::dataloader::DataLoader;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Trust policy for signature validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Trusted public keys (base64-encoded); empty trusts any valid key
    pub trusted_keys: Vec<String>,
    /// Whether a container without signatures or timestamp validates
    pub allow_unsigned: bool,
    /// Maximum age of signature in seconds (0 = no limit)
    pub max_signature_age: u64,
}

#[derive(Deserialize)]
struct TrustListFile {
    #[serde(default)]
    trusted_keys: Vec<String>,
    #[serde(default)]
    allow_unsigned: Option<bool>,
    #[serde(default)]
    max_signature_age: Option<u64>,
}

impl TrustPolicy {
    /// Policy that accepts unsigned containers and any valid key
    pub fn permissive() -> Self {
        Self {
            allow_unsigned: true,
            ..Default::default()
        }
    }

    /// Policy requiring signatures from the given keys
    pub fn strict(trusted_keys: Vec<String>) -> Self {
        Self {
            trusted_keys,
            allow_unsigned: false,
            max_signature_age: 0,
        }
    }

    /// Parse a trust list document
    pub fn from_toml(content: &str) -> Result<Self> {
        let parsed: TrustListFile = toml::from_str(content)
            .map_err(|e| Error::ConfigurationError(format!("Invalid trust list: {}", e)))?;
        Ok(Self {
            trusted_keys: parsed.trusted_keys,
            allow_unsigned: parsed.allow_unsigned.unwrap_or(false),
            max_signature_age: parsed.max_signature_age.unwrap_or(0),
        })
    }

    /// Read a trust list from a path or an http(s) URL
    pub fn load(location: &str, loader: &dyn DataLoader) -> Result<Self> {
        let content = match url::Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                info!("Fetching trust list from {}", url);
                let bytes = loader.get(url.as_str())?;
                String::from_utf8(bytes).map_err(|e| {
                    Error::ConfigurationError(format!("Trust list {} is not UTF-8: {}", location, e))
                })?
            }
            _ => std::fs::read_to_string(Path::new(location)).map_err(|e| {
                Error::IoError(format!("Failed to read trust list {}: {}", location, e))
            })?,
        };
        Self::from_toml(&content)
    }

    /// Build the policy from the `[validation]` settings
    ///
    /// Keys listed inline are merged with the ones from the trust list.
    pub fn from_settings(settings: &ValidationSettings, loader: &dyn DataLoader) -> Result<Self> {
        let mut policy = match &settings.trust_list {
            Some(location) => Self::load(location, loader)?,
            None => Self::default(),
        };
        policy.trusted_keys.extend(settings.trusted_keys.iter().cloned());
        policy.allow_unsigned |= settings.allow_unsigned;
        if settings.max_signature_age > 0 {
            policy.max_signature_age = settings.max_signature_age;
        }
        Ok(policy)
    }

    pub fn is_trusted(&self, public_key: &str) -> bool {
        self.trusted_keys.is_empty() || self.trusted_keys.iter().any(|k| k == public_key)
    }
}
