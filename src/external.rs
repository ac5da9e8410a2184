// src/external.rs

//! Detached (external) signing
//!
//! Signing is split into three steps that may run in different processes:
//!
//! 1. compute the data-to-sign for a container and export it as a file
//! 2. sign those bytes somewhere else (a hardware token, another host)
//! 3. import the raw signature value and apply it to the container
//!
//! [`ExternalSigning`] tracks where a run is in that sequence. Each method
//! consumes the value and returns the next state, so steps cannot be
//! repeated or skipped without a [`Error::ProtocolSequence`]. Nothing is
//! kept between processes: a run starts from [`ExternalSigning::new`] or
//! [`ExternalSigning::resume_with_digest`] depending on the command.

use crate::container::Container;
use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use crate::signing::{SignatureEngine, SignatureParameters, SignatureToken};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Protocol states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    DigestRequested,
    DigestComputed,
    AwaitingExternalSignature,
    SignatureReceived,
    Applied,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DigestRequested => "digest requested",
            Self::DigestComputed => "digest computed",
            Self::AwaitingExternalSignature => "awaiting external signature",
            Self::SignatureReceived => "signature received",
            Self::Applied => "applied",
        };
        f.write_str(name)
    }
}

/// One run of the detached signing protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalSigning {
    state: ProtocolState,
    digest: Option<Vec<u8>>,
    signature: Option<Vec<u8>>,
}

impl Default for ExternalSigning {
    fn default() -> Self {
        Self::new()
    }
}

impl ExternalSigning {
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Idle,
            digest: None,
            signature: None,
        }
    }

    /// Continue a run whose digest was exported by an earlier process
    pub fn resume_with_digest(digest: Vec<u8>) -> Self {
        Self {
            state: ProtocolState::AwaitingExternalSignature,
            digest: Some(digest),
            signature: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn digest(&self) -> Option<&[u8]> {
        self.digest.as_deref()
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Whether the container was modified by this run
    pub fn changed(&self) -> bool {
        self.state == ProtocolState::Applied
    }

    /// Ask the engine for the bytes to be signed
    pub fn compute_digest(
        self,
        engine: &dyn SignatureEngine,
        container: &Container,
        params: &SignatureParameters,
    ) -> Result<Self> {
        self.require_state("compute digest", &[ProtocolState::Idle])?;
        debug!("External signing: {}", ProtocolState::DigestRequested);

        let digest = engine
            .compute_digest(container, params)
            .map_err(|e| match e {
                Error::DigestComputation(_) => e,
                other => Error::DigestComputation(other.to_string()),
            })?;

        info!("Computed {} bytes of data to sign", digest.len());
        Ok(Self {
            state: ProtocolState::DigestComputed,
            digest: Some(digest),
            signature: None,
        })
    }

    /// Hand the digest to the outside world
    pub fn export_signature(self) -> Result<Self> {
        self.require_state("export digest", &[ProtocolState::DigestComputed])?;
        Ok(Self {
            state: ProtocolState::AwaitingExternalSignature,
            ..self
        })
    }

    /// Accept a raw signature value produced elsewhere
    pub fn import_signature(self, signature: Vec<u8>) -> Result<Self> {
        self.require_state(
            "import signature",
            &[ProtocolState::Idle, ProtocolState::AwaitingExternalSignature],
        )?;
        debug!("Imported {} byte signature value", signature.len());
        Ok(Self {
            state: ProtocolState::SignatureReceived,
            signature: Some(signature),
            ..self
        })
    }

    /// Read a raw signature value from a file
    pub fn load_signature(self, path: &Path) -> Result<Self> {
        self.require_state(
            "load signature",
            &[ProtocolState::Idle, ProtocolState::AwaitingExternalSignature],
        )?;
        let signature =
            fs::read(path).map_err(|_| Error::SignatureLoad(path.display().to_string()))?;
        self.import_signature(signature)
    }

    /// Sign the exported digest with a local token acting as the external signer
    pub fn sign_digest(
        self,
        token: &dyn SignatureToken,
        digest_algorithm: DigestAlgorithm,
    ) -> Result<Self> {
        self.require_state("sign digest", &[ProtocolState::AwaitingExternalSignature])?;
        let digest = self.digest.as_deref().ok_or_else(|| {
            Error::ProtocolSequence("cannot sign digest: no digest was loaded".to_string())
        })?;

        let signature = token.sign(digest_algorithm, digest)?;
        info!("Token produced {} byte signature value", signature.len());
        Ok(Self {
            state: ProtocolState::SignatureReceived,
            signature: Some(signature),
            digest: self.digest,
        })
    }

    /// Finalize the received signature and add it to the container
    pub fn apply(
        self,
        engine: &dyn SignatureEngine,
        container: &mut Container,
        params: &SignatureParameters,
    ) -> Result<Self> {
        self.require_state("apply signature", &[ProtocolState::SignatureReceived])?;
        let value = self.signature.as_deref().ok_or_else(|| {
            Error::ProtocolSequence("cannot apply signature: no signature value".to_string())
        })?;

        let signature = engine.build_data_to_sign(container, params)?.finalize(value)?;
        info!("Adding external signature {}", signature.id);
        container.add_signature(signature)?;

        Ok(Self {
            state: ProtocolState::Applied,
            ..self
        })
    }

    fn require_state(&self, action: &str, allowed: &[ProtocolState]) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(Error::ProtocolSequence(format!(
            "cannot {} in state '{}'",
            action, self.state
        )))
    }
}

/// Write a digest or signature file (raw bytes, no framing)
pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)
        .map_err(|e| Error::IoError(format!("Failed to write {}: {}", path.display(), e)))?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Read a digest file written by [`write_artifact`]
pub fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))
}
