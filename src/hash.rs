// src/hash.rs

//! Digest algorithms for data files, signatures and timestamp tokens
//!
//! | Algorithm | Output | XML URI |
//! |-----------|--------|---------|
//! | SHA-224 | 28 bytes | `http://www.w3.org/2001/04/xmldsig-more#sha224` |
//! | SHA-256 | 32 bytes | `http://www.w3.org/2001/04/xmlenc#sha256` |
//! | SHA-384 | 48 bytes | `http://www.w3.org/2001/04/xmldsig-more#sha384` |
//! | SHA-512 | 64 bytes | `http://www.w3.org/2001/04/xmlenc#sha512` |
//!
//! SHA-256 is the system default.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Digest algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DigestAlgorithm {
    Sha224,
    /// Default for signatures and timestamp tokens
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Get the algorithm name as a string
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha224 => "SHA224",
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// XML signature method URI
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Sha224 => "http://www.w3.org/2001/04/xmldsig-more#sha224",
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Compute the digest of a byte slice
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Compute the digest as a lowercase hex string
    pub fn digest_hex(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }

    /// Parse an algorithm name, falling back to the default on bad input
    ///
    /// Blank names silently select the default; unknown names are logged.
    pub fn parse_or_default(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => Self::default(),
            Some(name) => name.parse().unwrap_or_else(|e| {
                warn!("{}; falling back to {}", e, Self::default());
                Self::default()
            }),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [Self::Sha224, Self::Sha256, Self::Sha384, Self::Sha512];
        if let Some(found) = all.into_iter().find(|a| a.uri() == s) {
            return Ok(found);
        }
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(HashError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Digest algorithm errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Unknown digest algorithm name
    UnknownAlgorithm(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAlgorithm(name) => write!(f, "unknown digest algorithm: {}", name),
        }
    }
}

impl std::error::Error for HashError {}
