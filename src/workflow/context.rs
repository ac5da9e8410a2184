// src/workflow/context.rs

//! Per-run execution state

use super::Command;
use crate::container::{Container, ContainerFormat};
use crate::error::{Error, Result};
use crate::external::ExternalSigning;
use crate::report::ValidationResult;
use crate::signing::{SignatureToken, SigningCertificate};
use std::path::PathBuf;

/// State threaded through the steps of one command
///
/// Each step takes the context by value and returns the next one. It is
/// dropped when the command ends; nothing outlives the process.
pub struct ExecutionContext {
    pub format: ContainerFormat,
    pub container: Option<Container>,
    pub certificate: Option<SigningCertificate>,
    pub token: Option<Box<dyn SignatureToken>>,
    pub protocol: ExternalSigning,
    pub validation: Option<ValidationResult>,
    /// Set when a mutation or signing altered the container
    pub changed: bool,
    /// Files written for the outside world (digest, signature)
    pub artifacts: Vec<PathBuf>,
}

impl ExecutionContext {
    pub fn new(format: ContainerFormat) -> Self {
        Self {
            format,
            container: None,
            certificate: None,
            token: None,
            protocol: ExternalSigning::new(),
            validation: None,
            changed: false,
            artifacts: Vec::new(),
        }
    }

    pub fn container(&self) -> Result<&Container> {
        self.container.as_ref().ok_or_else(no_container)
    }

    pub fn container_mut(&mut self) -> Result<&mut Container> {
        self.container.as_mut().ok_or_else(no_container)
    }

    pub fn into_outcome(self, command: Command) -> ExecutionOutcome {
        let (data_files, signatures, timestamped) = match &self.container {
            Some(c) => (c.data_files().len(), c.signatures().len(), c.is_timestamped()),
            None => (0, 0, false),
        };
        ExecutionOutcome {
            command,
            format: self.format,
            changed: self.changed,
            data_files,
            signatures,
            timestamped,
            validation: self.validation,
            artifacts: self.artifacts,
        }
    }
}

fn no_container() -> Error {
    Error::ConfigurationError("No container is open".to_string())
}

/// Summary of a finished command
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub command: Command,
    pub format: ContainerFormat,
    pub changed: bool,
    pub data_files: usize,
    pub signatures: usize,
    pub timestamped: bool,
    pub validation: Option<ValidationResult>,
    pub artifacts: Vec<PathBuf>,
}
