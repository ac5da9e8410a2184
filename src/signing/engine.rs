// src/signing/engine.rs
//! Reference signature engine
//!
//! The bytes to be signed are a canonical JSON `SignedInfo` document that
//! binds the signature parameters, the signer key and a digest of every data
//! file. It contains no time-dependent values, so a later process can rebuild
//! identical bytes when a detached signature comes back. The claimed signing
//! time is an unsigned property of the finished signature.

use super::{
    DataToSign, EncryptionAlgorithm, LocalTimestampAuthority, Signature, SignatureEngine,
    SignatureParameters, SignatureProfile, SigningCertificate, TimestampToken, TrustPolicy,
};
use crate::config::Configuration;
use crate::container::{Container, ContainerFormat, DataFile};
use crate::dataloader::HttpDataLoader;
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use crate::report::{SignatureReport, SignatureStatus, ValidationResult};
use ed25519_dalek::Verifier;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Serialize)]
struct SignedInfo<'a> {
    mimetype: &'a str,
    profile: SignatureProfile,
    digest_algorithm: DigestAlgorithm,
    encryption_algorithm: EncryptionAlgorithm,
    signer: &'a str,
    references: Vec<Reference<'a>>,
}

#[derive(Serialize)]
struct Reference<'a> {
    name: &'a str,
    media_type: &'a str,
    digest: String,
}

/// Ed25519 signing and validation against a trust policy
#[derive(Debug, Clone, Default)]
pub struct LocalEngine {
    trust: TrustPolicy,
    timestamps: LocalTimestampAuthority,
}

impl LocalEngine {
    pub fn new(trust: TrustPolicy) -> Self {
        Self {
            trust,
            timestamps: LocalTimestampAuthority::default(),
        }
    }

    /// Build the engine, fetching the trust list through a decorated loader
    pub fn from_configuration(config: &Configuration) -> Result<Self> {
        let loader = HttpDataLoader::from_configuration(config);
        let trust = TrustPolicy::from_settings(&config.validation, &loader)?;
        debug!("Trust policy has {} trusted keys", trust.trusted_keys.len());
        Ok(Self::new(trust))
    }

    fn signed_info(
        container: &Container,
        profile: SignatureProfile,
        digest_algorithm: DigestAlgorithm,
        encryption_algorithm: EncryptionAlgorithm,
        certificate: &SigningCertificate,
    ) -> Result<Vec<u8>> {
        let references = container
            .data_files()
            .iter()
            .map(|file| Reference {
                name: file.name(),
                media_type: file.media_type(),
                digest: hex::encode(file.calculate_digest(digest_algorithm)),
            })
            .collect();

        let info = SignedInfo {
            mimetype: container.format().mimetype(),
            profile,
            digest_algorithm,
            encryption_algorithm,
            signer: &certificate.public_key,
            references,
        };
        serde_json::to_vec(&info)
            .map_err(|e| Error::DigestComputation(format!("Failed to encode signed info: {}", e)))
    }

    fn check_signature(&self, container: &Container, signature: &Signature) -> Result<()> {
        let bytes = Self::signed_info(
            container,
            signature.profile,
            signature.digest_algorithm,
            signature.encryption_algorithm,
            &signature.signing_certificate,
        )?;
        let key = signature.signing_certificate.verifying_key()?;
        let value = ed25519_dalek::Signature::from_slice(&signature.value_bytes()?)
            .map_err(|e| Error::EngineError(format!("Invalid signature value: {}", e)))?;

        key.verify(&signature.digest_algorithm.digest(&bytes), &value)
            .map_err(|e| Error::EngineError(format!("Signature verification failed: {}", e)))
    }

    fn signature_report(
        &self,
        container: &Container,
        signature: &Signature,
        result: &mut ValidationResult,
    ) -> SignatureReport {
        let status = match self.check_signature(container, signature) {
            Err(e) => SignatureStatus::Invalid {
                reason: e.to_string(),
            },
            Ok(()) if !self.trust.is_trusted(&signature.signing_certificate.public_key) => {
                SignatureStatus::Untrusted
            }
            Ok(()) => SignatureStatus::Valid,
        };

        if status == SignatureStatus::Valid
            && self.trust.max_signature_age > 0
            && let Ok(signed_time) =
                chrono::DateTime::parse_from_rfc3339(&signature.claimed_signing_time)
        {
            let age = chrono::Utc::now().signed_duration_since(signed_time);
            if age.num_seconds() > self.trust.max_signature_age as i64 {
                result.add_warning(format!(
                    "Signature {} is {} seconds old (max: {})",
                    signature.id,
                    age.num_seconds(),
                    self.trust.max_signature_age
                ));
            }
        }

        SignatureReport {
            id: signature.id.clone(),
            key_id: signature.signing_certificate.key_id.clone(),
            claimed_signing_time: signature.claimed_signing_time.clone(),
            status,
        }
    }
}

impl SignatureEngine for LocalEngine {
    fn build_data_to_sign(
        &self,
        container: &Container,
        params: &SignatureParameters,
    ) -> Result<DataToSign> {
        if container.data_files().is_empty() {
            return Err(Error::DigestComputation(
                "Container does not contain any data files".to_string(),
            ));
        }
        let certificate = params.signing_certificate.clone().ok_or_else(|| {
            Error::DigestComputation("A signing certificate is required".to_string())
        })?;

        let encryption_algorithm = match params.encryption_algorithm {
            Some(requested) if requested != certificate.algorithm => {
                return Err(Error::EngineError(format!(
                    "Requested encryption algorithm {} does not match the signer key ({})",
                    requested, certificate.algorithm
                )));
            }
            Some(requested) => requested,
            None => certificate.algorithm,
        };

        let bytes = Self::signed_info(
            container,
            params.profile,
            params.digest_algorithm,
            encryption_algorithm,
            &certificate,
        )?;
        debug!(
            "Built {} bytes of data to sign ({} profile, {})",
            bytes.len(),
            params.profile,
            params.digest_algorithm
        );

        Ok(DataToSign::new(
            params.profile,
            params.digest_algorithm,
            encryption_algorithm,
            certificate,
            bytes,
        ))
    }

    fn validate(&self, container: &Container) -> Result<ValidationResult> {
        if container.format() == ContainerFormat::Pades {
            return Err(Error::EngineError(
                "PAdES validation is not available in the local engine".to_string(),
            ));
        }

        let mut result = ValidationResult::new(container.format());

        if container.signatures().is_empty()
            && !container.is_timestamped()
            && !self.trust.allow_unsigned
        {
            result.add_error("Container is not signed");
        }

        for signature in container.signatures() {
            let report = self.signature_report(container, signature, &mut result);
            result.add_signature(report);
        }

        if let Some(token) = container.timestamp_token() {
            match container.data_files().iter().find(|f| f.name() == token.data_file) {
                Some(file) if token.covers(file) => {}
                Some(_) => result.add_error(format!(
                    "Timestamp token {} does not match data file {}",
                    token.serial, token.data_file
                )),
                None => result.add_error(format!(
                    "Timestamped data file {} is missing",
                    token.data_file
                )),
            }
        }

        info!(
            "Validated {} container: {}",
            container.format(),
            if result.is_valid { "valid" } else { "invalid" }
        );
        Ok(result)
    }

    fn generate_timestamp_token(
        &self,
        digest_algorithm: DigestAlgorithm,
        data_file: &DataFile,
    ) -> Result<TimestampToken> {
        Ok(self.timestamps.stamp(digest_algorithm, data_file))
    }
}
