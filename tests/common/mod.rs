// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use asicdoc::container::{Container, DataFile};
use asicdoc::hash::DigestAlgorithm;
use asicdoc::report::ValidationResult;
use asicdoc::signing::{
    DataToSign, LocalEngine, LocalTimestampAuthority, SignatureEngine, SignatureParameters,
    SignatureToken, SoftToken, SoftTokenProvider, TimestampToken, TrustPolicy,
};
use asicdoc::workflow::{AddFile, CommandOptions, Pkcs12Options, WorkflowEngine};
use asicdoc::{ArchiveStore, Error, Result};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

pub const KEYSTORE_PASSWORD: &str = "test-password";

/// Write a sample data file into `dir`
pub fn data_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// A `text/plain` add option; the file holds its own name
pub fn text_file(dir: &Path, name: &str) -> AddFile {
    AddFile {
        path: data_file(dir, name, name.as_bytes()),
        media_type: "text/plain".to_string(),
    }
}

/// `hello.txt` containing `hello`
pub fn hello(dir: &Path) -> AddFile {
    AddFile {
        path: data_file(dir, "hello.txt", b"hello"),
        media_type: "text/plain".to_string(),
    }
}

/// Signer key files written like `asicdoc keygen`
pub struct TestSigner {
    pub keystore: PathBuf,
    pub certificate: PathBuf,
    pub public_key: String,
}

impl TestSigner {
    pub fn pkcs12(&self) -> Pkcs12Options {
        Pkcs12Options {
            path: self.keystore.clone(),
            password: KEYSTORE_PASSWORD.to_string(),
        }
    }
}

/// Generate a keystore and certificate in `dir`
pub fn generate_signer(dir: &Path) -> TestSigner {
    let token = SoftToken::generate().with_key_id("test-signer");
    let keystore = dir.join("signer.p12");
    let certificate = dir.join("signer.cert");
    token.save(&keystore, KEYSTORE_PASSWORD).unwrap();
    token.certificate().save(&certificate).unwrap();
    TestSigner {
        keystore,
        certificate,
        public_key: token.certificate().public_key,
    }
}

/// Workflow with the reference engine; unsigned containers validate
pub fn local_workflow() -> WorkflowEngine<LocalEngine, ArchiveStore, SoftTokenProvider> {
    WorkflowEngine::new(
        LocalEngine::new(TrustPolicy::permissive()),
        ArchiveStore,
        SoftTokenProvider,
    )
}

/// Workflow with a scripted engine
pub fn mock_workflow(engine: MockEngine) -> WorkflowEngine<MockEngine, ArchiveStore, SoftTokenProvider> {
    WorkflowEngine::new(engine, ArchiveStore, SoftTokenProvider)
}

/// Process options for `container`
pub fn options_for(container: &Path) -> CommandOptions {
    CommandOptions {
        container: Some(container.to_path_buf()),
        ..Default::default()
    }
}

/// Scripted signature engine
///
/// Returns a fixed data-to-sign vector, reports a fixed validation verdict
/// and records which methods were called.
pub struct MockEngine {
    pub data_to_sign: Vec<u8>,
    pub valid: bool,
    pub calls: RefCell<Vec<&'static str>>,
}

impl MockEngine {
    pub fn new(data_to_sign: &[u8]) -> Self {
        Self {
            data_to_sign: data_to_sign.to_vec(),
            valid: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::new(b"data-to-sign")
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }
}

impl SignatureEngine for MockEngine {
    fn build_data_to_sign(
        &self,
        _container: &Container,
        params: &SignatureParameters,
    ) -> Result<DataToSign> {
        self.calls.borrow_mut().push("build_data_to_sign");
        let certificate = params
            .signing_certificate
            .clone()
            .ok_or_else(|| Error::DigestComputation("no certificate".to_string()))?;
        Ok(DataToSign::new(
            params.profile,
            params.digest_algorithm,
            certificate.algorithm,
            certificate,
            self.data_to_sign.clone(),
        ))
    }

    fn validate(&self, container: &Container) -> Result<ValidationResult> {
        self.calls.borrow_mut().push("validate");
        let mut result = ValidationResult::new(container.format());
        if !self.valid {
            result.add_error("scripted validation failure");
        }
        Ok(result)
    }

    fn generate_timestamp_token(
        &self,
        digest_algorithm: DigestAlgorithm,
        data_file: &DataFile,
    ) -> Result<TimestampToken> {
        self.calls.borrow_mut().push("generate_timestamp_token");
        Ok(LocalTimestampAuthority::default().stamp(digest_algorithm, data_file))
    }
}
