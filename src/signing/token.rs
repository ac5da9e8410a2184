// src/signing/token.rs
//! Signing tokens
//!
//! A token holds a private key and signs data on request. The reference
//! implementation is a software keystore: an Ed25519 key stored in a TOML
//! file. It stands in for a PKCS#12 bundle. Hardware (PKCS#11) tokens are
//! not reachable from the soft provider.
//!
//! The key is stored unencrypted. The password only gates [`SoftToken::open`]
//! through a salted digest, so the file itself must stay private: it is
//! created with mode 0600 on Unix before any key material is written.

use super::EncryptionAlgorithm;
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const KEYSTORE_ALGORITHM: &str = "ed25519";
const SALT_LEN: usize = 16;

/// Public half of a signer identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningCertificate {
    pub algorithm: EncryptionAlgorithm,
    /// Base64-encoded public key
    pub public_key: String,
    #[serde(default)]
    pub key_id: Option<String>,
}

impl SigningCertificate {
    /// Decode the Ed25519 public key
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        if self.algorithm != EncryptionAlgorithm::Eddsa {
            return Err(Error::EngineError(format!(
                "Unsupported certificate key algorithm: {}",
                self.algorithm
            )));
        }
        let bytes = BASE64
            .decode(&self.public_key)
            .map_err(|e| Error::EngineError(format!("Invalid public key base64: {}", e)))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::EngineError("Public key must be 32 bytes".to_string()))?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::EngineError(format!("Invalid public key: {}", e)))
    }

    /// Save as a TOML certificate file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::IoError(format!("Failed to encode certificate: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            Error::IoError(format!("Failed to write certificate {}: {}", path.display(), e))
        })
    }
}

/// Load a signer certificate file
pub fn load_certificate(path: &Path) -> Result<SigningCertificate> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::IoError(format!("Failed to read certificate {}: {}", path.display(), e))
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::ConfigurationError(format!("Failed to parse certificate {}: {}", path.display(), e))
    })
}

/// Something that can produce signature values
pub trait SignatureToken {
    /// Certificate of the key held by this token
    fn certificate(&self) -> SigningCertificate;

    /// Sign `data`, hashing it first with `digest_algorithm`
    fn sign(&self, digest_algorithm: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>>;
}

/// Opens PKCS#11 and PKCS#12 tokens
pub trait TokenProvider {
    fn pkcs11(&self, module: &str, pin: &str, slot: u64) -> Result<Box<dyn SignatureToken>>;

    fn pkcs12(&self, path: &Path, password: &str) -> Result<Box<dyn SignatureToken>>;
}

/// Token provider backed by soft keystore files
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftTokenProvider;

impl TokenProvider for SoftTokenProvider {
    fn pkcs11(&self, module: &str, _pin: &str, slot: u64) -> Result<Box<dyn SignatureToken>> {
        Err(Error::TokenError(format!(
            "PKCS#11 module {} (slot {}) is not available to the soft token provider",
            module, slot
        )))
    }

    fn pkcs12(&self, path: &Path, password: &str) -> Result<Box<dyn SignatureToken>> {
        Ok(Box::new(SoftToken::open(path, password)?))
    }
}

/// Ed25519 key held in memory
pub struct SoftToken {
    signing_key: SigningKey,
    key_id: Option<String>,
}

impl SoftToken {
    /// Generate a new random key
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            key_id: None,
        }
    }

    pub fn from_signing_key(key: SigningKey) -> Self {
        Self {
            signing_key: key,
            key_id: None,
        }
    }

    /// Set a human-readable key identifier
    pub fn with_key_id(mut self, id: &str) -> Self {
        self.key_id = Some(id.to_string());
        self
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Write the key to a keystore file that opens with `password`
    pub fn save(&self, path: &Path, password: &str) -> Result<()> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);

        let keystore = KeystoreFile {
            algorithm: KEYSTORE_ALGORITHM.to_string(),
            key: BASE64.encode(self.signing_key.to_bytes()),
            key_id: self.key_id.clone(),
            salt: hex::encode(salt),
            password_digest: password_digest(&salt, password),
        };
        let content = toml::to_string_pretty(&keystore)
            .map_err(|e| Error::IoError(format!("Failed to encode keystore: {}", e)))?;
        let write_err = |e: std::io::Error| {
            Error::IoError(format!("Failed to write keystore {}: {}", path.display(), e))
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(write_err)?;

        // An existing file keeps its old mode
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }

        file.write_all(content.as_bytes()).map_err(write_err)?;
        Ok(())
    }

    /// Open a keystore file, checking the password
    pub fn open(path: &Path, password: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::TokenError(format!("Failed to read keystore {}: {}", path.display(), e))
        })?;
        let keystore: KeystoreFile = toml::from_str(&content).map_err(|e| {
            Error::TokenError(format!("Failed to parse keystore {}: {}", path.display(), e))
        })?;

        if keystore.algorithm != KEYSTORE_ALGORITHM {
            return Err(Error::TokenError(format!(
                "Unsupported key algorithm: {}",
                keystore.algorithm
            )));
        }

        let salt = hex::decode(&keystore.salt)
            .map_err(|e| Error::TokenError(format!("Invalid keystore salt: {}", e)))?;
        if password_digest(&salt, password) != keystore.password_digest {
            return Err(Error::TokenError(format!(
                "Wrong password for keystore {}",
                path.display()
            )));
        }

        let key_bytes = BASE64
            .decode(&keystore.key)
            .map_err(|e| Error::TokenError(format!("Invalid base64 in keystore: {}", e)))?;
        let key_array: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| Error::TokenError("Invalid key length".to_string()))?;

        debug!("Opened soft token {}", path.display());
        Ok(Self {
            signing_key: SigningKey::from_bytes(&key_array),
            key_id: keystore.key_id,
        })
    }
}

impl SignatureToken for SoftToken {
    fn certificate(&self) -> SigningCertificate {
        SigningCertificate {
            algorithm: EncryptionAlgorithm::Eddsa,
            public_key: BASE64.encode(self.signing_key.verifying_key().as_bytes()),
            key_id: self.key_id.clone(),
        }
    }

    fn sign(&self, digest_algorithm: DigestAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        let digest = digest_algorithm.digest(data);
        Ok(self.signing_key.sign(&digest).to_bytes().to_vec())
    }
}

/// Keystore file format
#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    algorithm: String,
    key: String,
    #[serde(default)]
    key_id: Option<String>,
    salt: String,
    password_digest: String,
}

fn password_digest(salt: &[u8], password: &str) -> String {
    let mut input = salt.to_vec();
    input.extend_from_slice(password.as_bytes());
    DigestAlgorithm::Sha256.digest_hex(&input)
}
