// src/container/mod.rs

//! Signed document containers
//!
//! A [`Container`] holds data files, signatures and (ASiC-S only) a
//! timestamp token. All mutation goes through its methods, which enforce
//! the format rules:
//!
//! - ASiC-S holds at most one data file, and either one signature or one
//!   timestamp token, never both
//! - data files cannot be added to or removed from a signed container
//! - PAdES containers are produced by PDF tooling and never mutated here

pub mod format;
pub mod store;

pub use format::{ContainerFormat, resolve};
pub use store::{ArchiveStore, ContainerStore};

use crate::error::{Error, Result};
use crate::hash::DigestAlgorithm;
use crate::manifest::Manifest;
use crate::signing::{Signature, TimestampToken};
use std::fs;
use std::path::Path;
use tracing::debug;

/// A named document stored in a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFile {
    name: String,
    media_type: String,
    content: Vec<u8>,
}

impl DataFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content,
        }
    }

    /// Read a file from disk; the container entry is named after the file
    pub fn from_path(path: &Path, media_type: &str) -> Result<Self> {
        if !is_media_type(media_type) {
            return Err(Error::ConfigurationError(format!(
                "Unknown mime type: {}",
                media_type
            )));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::ConfigurationError(format!("Not a file path: {}", path.display()))
            })?;
        let content = fs::read(path).map_err(|e| {
            Error::IoError(format!("Failed to read data file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(name, media_type, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn calculate_digest(&self, algorithm: DigestAlgorithm) -> Vec<u8> {
        algorithm.digest(&self.content)
    }

    /// Write the content to `path`
    pub fn save_as(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.content).map_err(|e| {
            Error::IoError(format!(
                "Failed to extract {} to {}: {}",
                self.name,
                path.display(),
                e
            ))
        })
    }
}

/// `type/subtype` with both halves present
fn is_media_type(value: &str) -> bool {
    match value.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !value.chars().any(|c| c.is_whitespace())
        }
        None => false,
    }
}

/// An in-memory container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    format: ContainerFormat,
    data_files: Vec<DataFile>,
    signatures: Vec<Signature>,
    timestamp_token: Option<TimestampToken>,
}

impl Container {
    /// Create an empty container
    pub fn new(format: ContainerFormat) -> Self {
        Self {
            format,
            data_files: Vec::new(),
            signatures: Vec::new(),
            timestamp_token: None,
        }
    }

    /// Reassemble a container read from storage
    pub(crate) fn from_parts(
        format: ContainerFormat,
        data_files: Vec<DataFile>,
        signatures: Vec<Signature>,
        timestamp_token: Option<TimestampToken>,
    ) -> Self {
        Self {
            format,
            data_files,
            signatures,
            timestamp_token,
        }
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    pub fn data_files(&self) -> &[DataFile] {
        &self.data_files
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn timestamp_token(&self) -> Option<&TimestampToken> {
        self.timestamp_token.as_ref()
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn is_timestamped(&self) -> bool {
        self.timestamp_token.is_some()
    }

    /// Find a data file by name, ignoring ASCII case
    pub fn find_data_file(&self, name: &str) -> Option<&DataFile> {
        self.data_files
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Manifest describing the current data files
    pub fn manifest(&self) -> Result<Manifest> {
        Manifest::for_data_files(
            self.data_files
                .iter()
                .map(|f| (f.name.as_str(), f.media_type.as_str())),
        )
    }

    pub fn add_data_file(&mut self, file: DataFile) -> Result<()> {
        self.ensure_mutable()?;
        if self.is_signed() || self.is_timestamped() {
            return Err(Error::ContainerSigned("added to"));
        }
        if store::is_reserved_entry(&file.name) {
            return Err(Error::ReservedEntryName(file.name));
        }
        if self.data_files.iter().any(|f| f.name == file.name) {
            return Err(Error::DuplicateDataFile(file.name));
        }
        if self.format == ContainerFormat::Asics && !self.data_files.is_empty() {
            return Err(Error::SingleDataFileExceeded);
        }

        debug!("Adding data file {} ({})", file.name, file.media_type);
        self.data_files.push(file);
        Ok(())
    }

    /// Remove a data file by exact name
    pub fn remove_data_file(&mut self, name: &str) -> Result<DataFile> {
        self.ensure_mutable()?;
        let index = self
            .data_files
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| Error::DataFileNotFound(name.to_string()))?;
        if self.is_signed() || self.is_timestamped() {
            return Err(Error::ContainerSigned("removed from"));
        }

        debug!("Removing data file {}", name);
        Ok(self.data_files.remove(index))
    }

    /// Check that an ASiC-S container is not sealed yet
    ///
    /// Other formats always pass.
    pub fn ensure_asics_unsealed(&self) -> Result<()> {
        if self.format != ContainerFormat::Asics {
            return Ok(());
        }
        if self.is_timestamped() {
            return Err(Error::ContainerAlreadyTimestamped);
        }
        if self.is_signed() {
            return Err(Error::ContainerAlreadySigned);
        }
        Ok(())
    }

    pub fn add_signature(&mut self, signature: Signature) -> Result<()> {
        self.ensure_mutable()?;
        self.ensure_asics_unsealed()?;
        if self.data_files.is_empty() {
            return Err(Error::EngineError(
                "Cannot add a signature to a container without data files".to_string(),
            ));
        }

        debug!("Adding signature {}", signature.id);
        self.signatures.push(signature);
        Ok(())
    }

    /// Seal an ASiC-S container with a timestamp token
    pub fn set_timestamp_token(&mut self, token: TimestampToken) -> Result<()> {
        if self.format != ContainerFormat::Asics {
            return Err(Error::ConfigurationError(format!(
                "Timestamp tokens are only supported for ASICS containers, not {}",
                self.format
            )));
        }
        self.ensure_asics_unsealed()?;

        debug!("Adding timestamp token {}", token.serial);
        self.timestamp_token = Some(token);
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.format == ContainerFormat::Pades {
            return Err(Error::ConfigurationError(
                "PAdES containers cannot be modified".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{LocalTimestampAuthority, SignatureToken, SoftToken};
    use crate::signing::{DataToSign, EncryptionAlgorithm, SignatureProfile};
    use tempfile::TempDir;

    fn hello() -> DataFile {
        DataFile::new("hello.txt", "text/plain", b"hello".to_vec())
    }

    fn signature() -> Signature {
        DataToSign::new(
            SignatureProfile::Lt,
            DigestAlgorithm::Sha256,
            EncryptionAlgorithm::Eddsa,
            SoftToken::generate().certificate(),
            b"payload".to_vec(),
        )
        .finalize(&[7; 64])
        .unwrap()
    }

    #[test]
    fn test_duplicate_data_file_rejected() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        let err = container.add_data_file(hello()).unwrap_err();
        assert!(matches!(err, Error::DuplicateDataFile(ref name) if name == "hello.txt"));
        assert_eq!(container.data_files().len(), 1);
    }

    #[test]
    fn test_reserved_names_rejected() {
        let mut container = Container::new(ContainerFormat::Asice);
        for name in ["mimetype", "META-INF/manifest.xml", "META-INF/signatures0.json"] {
            let err = container
                .add_data_file(DataFile::new(name, "text/plain", b"x".to_vec()))
                .unwrap_err();
            assert!(matches!(err, Error::ReservedEntryName(ref n) if n == name));
            assert_eq!(err.kind(), crate::error::ErrorKind::Integrity);
        }
        assert!(container.data_files().is_empty());
    }

    #[test]
    fn test_asics_single_data_file() {
        let mut container = Container::new(ContainerFormat::Asics);
        container.add_data_file(hello()).unwrap();
        let err = container
            .add_data_file(DataFile::new("b.txt", "text/plain", vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::SingleDataFileExceeded));
    }

    #[test]
    fn test_asics_signature_excludes_timestamp() {
        let mut container = Container::new(ContainerFormat::Asics);
        container.add_data_file(hello()).unwrap();
        container.add_signature(signature()).unwrap();

        let token = LocalTimestampAuthority::default().stamp(DigestAlgorithm::Sha256, &hello());
        assert!(matches!(
            container.set_timestamp_token(token),
            Err(Error::ContainerAlreadySigned)
        ));
        assert!(matches!(
            container.add_signature(signature()),
            Err(Error::ContainerAlreadySigned)
        ));
        assert_eq!(container.signatures().len(), 1);
        assert!(!container.is_timestamped());
    }

    #[test]
    fn test_asics_timestamp_excludes_signature() {
        let mut container = Container::new(ContainerFormat::Asics);
        container.add_data_file(hello()).unwrap();
        let token = LocalTimestampAuthority::default().stamp(DigestAlgorithm::Sha256, &hello());
        container.set_timestamp_token(token.clone()).unwrap();

        assert!(matches!(
            container.add_signature(signature()),
            Err(Error::ContainerAlreadyTimestamped)
        ));
        assert!(matches!(
            container.set_timestamp_token(token),
            Err(Error::ContainerAlreadyTimestamped)
        ));
        assert!(container.signatures().is_empty());
    }

    #[test]
    fn test_asice_allows_many_signatures() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        container.add_signature(signature()).unwrap();
        container.add_signature(signature()).unwrap();
        assert_eq!(container.signatures().len(), 2);
        assert!(container.ensure_asics_unsealed().is_ok());
    }

    #[test]
    fn test_timestamp_only_for_asics() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        let token = LocalTimestampAuthority::default().stamp(DigestAlgorithm::Sha256, &hello());
        assert!(matches!(
            container.set_timestamp_token(token),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_signed_container_data_files_frozen() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        container.add_signature(signature()).unwrap();

        assert!(matches!(
            container.remove_data_file("hello.txt"),
            Err(Error::ContainerSigned("removed from"))
        ));
        assert!(matches!(
            container.add_data_file(DataFile::new("b.txt", "text/plain", vec![])),
            Err(Error::ContainerSigned("added to"))
        ));
    }

    #[test]
    fn test_remove_missing_data_file() {
        let mut container = Container::new(ContainerFormat::Asice);
        assert!(matches!(
            container.remove_data_file("missing.txt"),
            Err(Error::DataFileNotFound(_))
        ));
    }

    #[test]
    fn test_pades_is_immutable() {
        let mut container = Container::from_parts(
            ContainerFormat::Pades,
            vec![DataFile::new("doc.pdf", "application/pdf", b"%PDF-1.7".to_vec())],
            Vec::new(),
            None,
        );
        assert!(matches!(
            container.add_data_file(hello()),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            container.remove_data_file("doc.pdf"),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_find_data_file_ignores_case() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        assert!(container.find_data_file("HELLO.TXT").is_some());
        assert!(container.find_data_file("missing.txt").is_none());
    }

    #[test]
    fn test_manifest_lists_data_files() {
        let mut container = Container::new(ContainerFormat::Asice);
        container.add_data_file(hello()).unwrap();
        container
            .add_data_file(DataFile::new("data.json", "application/json", b"{}".to_vec()))
            .unwrap();
        let manifest = container.manifest().unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.lookup("data.json").unwrap().media_type(), "application/json");
    }

    #[test]
    fn test_data_file_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("note.txt");
        fs::write(&path, b"note").unwrap();

        let file = DataFile::from_path(&path, "text/plain").unwrap();
        assert_eq!(file.name(), "note.txt");
        assert_eq!(file.size(), 4);
        assert_eq!(
            file.calculate_digest(DigestAlgorithm::Sha256),
            DigestAlgorithm::Sha256.digest(b"note")
        );

        assert!(matches!(
            DataFile::from_path(&path, "plain"),
            Err(Error::ConfigurationError(_))
        ));
        assert!(matches!(
            DataFile::from_path(&temp_dir.path().join("absent.txt"), "text/plain"),
            Err(Error::IoError(_))
        ));
    }

    #[test]
    fn test_save_as_writes_content() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out.txt");
        hello().save_as(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"hello");
    }
}
