// src/signing/timestamp.rs
//! Timestamp tokens for ASiC-S containers
//!
//! A timestamp token seals the single data file of an ASiC-S container in
//! place of a signature.

use crate::container::DataFile;
use crate::hash::DigestAlgorithm;
use serde::{Deserialize, Serialize};

/// Timestamp over one data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampToken {
    /// Serial number assigned by the authority
    pub serial: String,
    pub authority: String,
    /// Name of the stamped data file
    pub data_file: String,
    pub digest_algorithm: DigestAlgorithm,
    /// Hex digest of the data file content
    pub digest: String,
    /// Generation time (RFC 3339)
    pub generation_time: String,
}

impl TimestampToken {
    /// Check the token against a data file
    pub fn covers(&self, data_file: &DataFile) -> bool {
        self.data_file == data_file.name()
            && self.digest_algorithm.digest_hex(data_file.bytes()) == self.digest
    }
}

/// In-process timestamp authority
#[derive(Debug, Clone)]
pub struct LocalTimestampAuthority {
    name: String,
}

impl Default for LocalTimestampAuthority {
    fn default() -> Self {
        Self::new("asicdoc local TSA")
    }
}

impl LocalTimestampAuthority {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stamp a data file
    pub fn stamp(&self, digest_algorithm: DigestAlgorithm, data_file: &DataFile) -> TimestampToken {
        TimestampToken {
            serial: uuid::Uuid::new_v4().to_string(),
            authority: self.name.clone(),
            data_file: data_file.name().to_string(),
            digest_algorithm,
            digest: digest_algorithm.digest_hex(data_file.bytes()),
            generation_time: chrono::Utc::now().to_rfc3339(),
        }
    }
}
