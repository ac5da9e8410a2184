// src/signing/mod.rs

//! Signature creation and validation
//!
//! The workflow talks to the cryptographic engine only through the
//! [`SignatureEngine`] and [`SignatureToken`] traits. A signature is produced in
//! two halves: the engine builds the canonical bytes to be signed
//! ([`DataToSign`]), something holding a private key signs them, and the
//! engine finalizes the raw value into a [`Signature`] for the container.
//! The halves may run in different processes (see [`crate::external`]).

pub mod engine;
pub mod timestamp;
pub mod token;
pub mod trust;

pub use engine::LocalEngine;
pub use timestamp::{LocalTimestampAuthority, TimestampToken};
pub use token::{
    SignatureToken, SigningCertificate, SoftToken, SoftTokenProvider, TokenProvider,
    load_certificate,
};
pub use trust::TrustPolicy;

use crate::container::{Container, DataFile};
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use crate::report::ValidationResult;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Signature profile (baseline level of the produced signature)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum SignatureProfile {
    /// Long-term with OCSP and timestamp
    #[default]
    #[strum(serialize = "LT")]
    #[serde(rename = "LT")]
    Lt,
    /// Long-term with time-mark (legacy BDOC)
    #[strum(serialize = "LT_TM")]
    #[serde(rename = "LT_TM")]
    LtTm,
    /// Long-term with archive timestamp
    #[strum(serialize = "LTA")]
    #[serde(rename = "LTA")]
    Lta,
    #[strum(serialize = "B_BES")]
    #[serde(rename = "B_BES")]
    BBes,
    #[strum(serialize = "B_EPES")]
    #[serde(rename = "B_EPES")]
    BEpes,
}

/// Signature encryption (key) algorithm
///
/// Names are matched exactly, so `rsa` is not a valid spelling of `RSA`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum EncryptionAlgorithm {
    Rsa,
    Ecdsa,
    Eddsa,
}

/// Everything the engine needs to build a signature besides the container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureParameters {
    pub profile: SignatureProfile,
    pub digest_algorithm: DigestAlgorithm,
    /// Requested key algorithm; `None` takes the signer certificate's
    pub encryption_algorithm: Option<EncryptionAlgorithm>,
    pub signing_certificate: Option<SigningCertificate>,
}

/// Builder collecting profile and encryption configuration before signing
#[derive(Debug, Clone, Default)]
pub struct SignatureBuilder {
    parameters: SignatureParameters,
}

impl SignatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: SignatureProfile) -> Self {
        self.parameters.profile = profile;
        self
    }

    pub fn with_digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.parameters.digest_algorithm = algorithm;
        self
    }

    pub fn with_encryption_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.parameters.encryption_algorithm = Some(algorithm);
        self
    }

    pub fn with_signing_certificate(mut self, certificate: SigningCertificate) -> Self {
        self.parameters.signing_certificate = Some(certificate);
        self
    }

    pub fn build(self) -> SignatureParameters {
        self.parameters
    }
}

/// A finalized signature as stored in a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub id: String,
    pub profile: SignatureProfile,
    pub digest_algorithm: DigestAlgorithm,
    pub encryption_algorithm: EncryptionAlgorithm,
    pub signing_certificate: SigningCertificate,
    /// Claimed signing time (RFC 3339); not covered by the signature value
    pub claimed_signing_time: String,
    /// Base64-encoded signature value
    pub value: String,
}

impl Signature {
    /// Decoded signature value
    pub fn value_bytes(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(&self.value)
            .map_err(|e| Error::EngineError(format!("Invalid signature value in {}: {}", self.id, e)))
    }

    /// Parameters the signature was created with
    pub fn parameters(&self) -> SignatureParameters {
        SignatureParameters {
            profile: self.profile,
            digest_algorithm: self.digest_algorithm,
            encryption_algorithm: Some(self.encryption_algorithm),
            signing_certificate: Some(self.signing_certificate.clone()),
        }
    }
}

/// Canonical bytes awaiting a signature value
#[derive(Debug, Clone)]
pub struct DataToSign {
    profile: SignatureProfile,
    digest_algorithm: DigestAlgorithm,
    encryption_algorithm: EncryptionAlgorithm,
    certificate: SigningCertificate,
    bytes: Vec<u8>,
}

impl DataToSign {
    pub fn new(
        profile: SignatureProfile,
        digest_algorithm: DigestAlgorithm,
        encryption_algorithm: EncryptionAlgorithm,
        certificate: SigningCertificate,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            profile,
            digest_algorithm,
            encryption_algorithm,
            certificate,
            bytes,
        }
    }

    /// The bytes an external signer must sign
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest_algorithm
    }

    /// Combine with a raw signature value into a container signature
    pub fn finalize(self, signature_value: &[u8]) -> Result<Signature> {
        if signature_value.is_empty() {
            return Err(Error::EngineError("Empty signature value".to_string()));
        }

        Ok(Signature {
            id: format!("S-{}", uuid::Uuid::new_v4().simple()),
            profile: self.profile,
            digest_algorithm: self.digest_algorithm,
            encryption_algorithm: self.encryption_algorithm,
            signing_certificate: self.certificate,
            claimed_signing_time: chrono::Utc::now().to_rfc3339(),
            value: BASE64.encode(signature_value),
        })
    }
}

/// Signature creation and validation service
pub trait SignatureEngine {
    /// Build the canonical bytes to be signed for `container`
    fn build_data_to_sign(
        &self,
        container: &Container,
        params: &SignatureParameters,
    ) -> Result<DataToSign>;

    /// Validate every signature and timestamp token in `container`
    fn validate(&self, container: &Container) -> Result<ValidationResult>;

    /// Produce a timestamp token over one data file
    fn generate_timestamp_token(
        &self,
        digest_algorithm: DigestAlgorithm,
        data_file: &DataFile,
    ) -> Result<TimestampToken>;

    /// Bytes handed to an external signer
    fn compute_digest(&self, container: &Container, params: &SignatureParameters) -> Result<Vec<u8>> {
        Ok(self.build_data_to_sign(container, params)?.bytes().to_vec())
    }

    /// Sign `container` with a token holding the private key
    fn sign(
        &self,
        container: &Container,
        token: &dyn SignatureToken,
        params: &SignatureParameters,
    ) -> Result<Signature> {
        let mut params = params.clone();
        params.signing_certificate = Some(token.certificate());

        let data_to_sign = self.build_data_to_sign(container, &params)?;
        let value = token.sign(data_to_sign.digest_algorithm(), data_to_sign.bytes())?;
        data_to_sign.finalize(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_names_are_exact() {
        assert_eq!("LT".parse::<SignatureProfile>().unwrap(), SignatureProfile::Lt);
        assert_eq!("LT_TM".parse::<SignatureProfile>().unwrap(), SignatureProfile::LtTm);
        assert_eq!("B_EPES".parse::<SignatureProfile>().unwrap(), SignatureProfile::BEpes);
        assert!("lt".parse::<SignatureProfile>().is_err());
        assert!("XYZ".parse::<SignatureProfile>().is_err());
        assert_eq!(SignatureProfile::default().to_string(), "LT");
    }

    #[test]
    fn test_encryption_names_are_exact() {
        assert_eq!("RSA".parse::<EncryptionAlgorithm>().unwrap(), EncryptionAlgorithm::Rsa);
        assert_eq!("EDDSA".parse::<EncryptionAlgorithm>().unwrap(), EncryptionAlgorithm::Eddsa);
        assert!("rsa".parse::<EncryptionAlgorithm>().is_err());
        assert_eq!(EncryptionAlgorithm::Ecdsa.to_string(), "ECDSA");
    }

    #[test]
    fn test_builder_collects_parameters() {
        let params = SignatureBuilder::new()
            .with_profile(SignatureProfile::Lta)
            .with_digest_algorithm(DigestAlgorithm::Sha512)
            .with_encryption_algorithm(EncryptionAlgorithm::Eddsa)
            .build();
        assert_eq!(params.profile, SignatureProfile::Lta);
        assert_eq!(params.digest_algorithm, DigestAlgorithm::Sha512);
        assert_eq!(params.encryption_algorithm, Some(EncryptionAlgorithm::Eddsa));
        assert!(params.signing_certificate.is_none());
    }

    #[test]
    fn test_finalize_rejects_empty_value() {
        let certificate = SoftToken::generate().certificate();
        let data = DataToSign::new(
            SignatureProfile::Lt,
            DigestAlgorithm::Sha256,
            EncryptionAlgorithm::Eddsa,
            certificate,
            b"payload".to_vec(),
        );
        assert!(matches!(data.finalize(&[]), Err(Error::EngineError(_))));
    }

    #[test]
    fn test_finalize_encodes_value() {
        let certificate = SoftToken::generate().certificate();
        let data = DataToSign::new(
            SignatureProfile::BBes,
            DigestAlgorithm::Sha384,
            EncryptionAlgorithm::Eddsa,
            certificate.clone(),
            b"payload".to_vec(),
        );
        let signature = data.finalize(&[1, 2, 3]).unwrap();
        assert!(signature.id.starts_with("S-"));
        assert_eq!(signature.value_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(signature.signing_certificate, certificate);
        assert_eq!(signature.parameters().profile, SignatureProfile::BBes);
    }
}
