// src/lib.rs

//! asicdoc
//!
//! Signed document containers (ASiC-E, ASiC-S, BDOC) with detached signing.
//!
//! # Architecture
//!
//! - Containers: data files plus a manifest, signatures and an optional
//!   ASiC-S timestamp token
//! - Workflow: each command is a fixed table of steps run by one interpreter
//! - Collaborators behind traits: signature engine, container store, tokens
//! - External signing: digest out, raw signature in, across processes

pub mod config;
pub mod container;
pub mod dataloader;
mod error;
pub mod external;
pub mod hash;
pub mod manifest;
pub mod report;
pub mod signing;
pub mod workflow;

pub use config::Configuration;
pub use container::{
    ArchiveStore, Container, ContainerFormat, ContainerStore, DataFile, resolve,
};
pub use error::{Error, ErrorKind, Result};
pub use external::{ExternalSigning, ProtocolState};
pub use hash::{DigestAlgorithm, HashError};
pub use manifest::{MANIFEST_PATH, Manifest};
pub use report::{ReportWriter, SignatureReport, SignatureStatus, ValidationResult};
pub use signing::{
    EncryptionAlgorithm, LocalEngine, SignatureEngine, SignatureParameters, SignatureProfile,
    SignatureToken, SoftToken, SoftTokenProvider, TokenProvider,
};
pub use workflow::{Command, CommandOptions, ExecutionOutcome, WorkflowEngine};
