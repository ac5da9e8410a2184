// src/error.rs

//! Error types for asicdoc
//!
//! Every failure maps onto one [`ErrorKind`] of the taxonomy and one stable
//! process exit code, so the command line tool can report a single message
//! and a distinguishing status.

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code reserved for a data file that is not present in the container
pub const EXIT_DATA_FILE_NOT_FOUND: i32 = 4;

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolvable or contradictory command options
    Configuration,
    /// Container or manifest integrity violation
    Integrity,
    /// External signing steps invoked out of order
    ProtocolSequence,
    /// File read/write/extract failure
    Io,
    /// Failure surfaced from the signing/validation engine or a token
    Engine,
    /// Container failed signature or certificate validation
    Validation,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Unknown encryption algorithm: {0}")]
    UnknownEncryptionAlgorithm(String),

    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("duplicate entry in manifest file: {0}")]
    DuplicateEntry(String),

    #[error("Data file {0} already exists in the container")]
    DuplicateDataFile(String),

    #[error("This container is already signed. Should be only one signature in case of ASiCS container.")]
    ContainerAlreadySigned,

    #[error("This container has already timestamp. Should be no signatures in case of timestamped ASiCS container.")]
    ContainerAlreadyTimestamped,

    #[error("Data file in container already exists. Should be only one data file in case of ASiCS container.")]
    SingleDataFileExceeded,

    #[error("Data files cannot be {0} an already signed container")]
    ContainerSigned(&'static str),

    #[error("Malformed container: {0}")]
    MalformedContainer(String),

    #[error("Data file name {0} is reserved for container metadata")]
    ReservedEntryName(String),

    #[error("Protocol sequence error: {0}")]
    ProtocolSequence(String),

    #[error("Data file {0} was not found in the container")]
    DataFileNotFound(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Unable to load signature file from <{0}>")]
    SignatureLoad(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("Digest computation failed: {0}")]
    DigestComputation(String),

    #[error("Token error: {0}")]
    TokenError(String),

    #[error("Signing engine error: {0}")]
    EngineError(String),

    #[error("Container has errors: {0}")]
    ValidationFailure(String),
}

impl Error {
    /// Taxonomy category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigurationError(_) | Self::UnknownEncryptionAlgorithm(_) => {
                ErrorKind::Configuration
            }
            Self::MalformedManifest(_)
            | Self::DuplicateEntry(_)
            | Self::DuplicateDataFile(_)
            | Self::ContainerAlreadySigned
            | Self::ContainerAlreadyTimestamped
            | Self::SingleDataFileExceeded
            | Self::ContainerSigned(_)
            | Self::MalformedContainer(_)
            | Self::ReservedEntryName(_) => ErrorKind::Integrity,
            Self::ProtocolSequence(_) => ErrorKind::ProtocolSequence,
            Self::DataFileNotFound(_)
            | Self::ContainerNotFound(_)
            | Self::SignatureLoad(_)
            | Self::IoError(_)
            | Self::Io(_)
            | Self::DownloadError(_) => ErrorKind::Io,
            Self::DigestComputation(_) | Self::TokenError(_) | Self::EngineError(_) => {
                ErrorKind::Engine
            }
            Self::ValidationFailure(_) => ErrorKind::Validation,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        if let Self::DataFileNotFound(_) = self {
            return EXIT_DATA_FILE_NOT_FOUND;
        }
        match self.kind() {
            ErrorKind::Engine => 1,
            ErrorKind::Configuration => 2,
            ErrorKind::Integrity => 3,
            ErrorKind::ProtocolSequence => 5,
            ErrorKind::Validation => 6,
            ErrorKind::Io => 7,
        }
    }

    /// Errors that indicate a caller mistake and must never be retried
    pub fn is_caller_mistake(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Integrity | ErrorKind::ProtocolSequence
        )
    }
}
