// src/report.rs
//! Validation results and reports
//!
//! A [`ValidationResult`] is printed to stdout with `[OK]`/`[FAILED]` markers
//! and, when a report directory is requested, written there as JSON and text.

use crate::container::ContainerFormat;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the machine-readable report
pub const JSON_REPORT: &str = "validation-report.json";
/// File name of the human-readable report
pub const TEXT_REPORT: &str = "validation-report.txt";

/// Validation status of one signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SignatureStatus {
    /// Signature verified and signer trusted
    Valid,
    /// Signature value does not verify
    Invalid { reason: String },
    /// Signature verifies but the signer key is not trusted
    Untrusted,
}

/// Per-signature section of a report
#[derive(Debug, Clone, Serialize)]
pub struct SignatureReport {
    pub id: String,
    pub key_id: Option<String>,
    pub claimed_signing_time: String,
    #[serde(flatten)]
    pub status: SignatureStatus,
}

/// Outcome of validating one container
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub container_format: ContainerFormat,
    pub signatures: Vec<SignatureReport>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new(container_format: ContainerFormat) -> Self {
        Self {
            is_valid: true,
            container_format,
            signatures: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn add_signature(&mut self, report: SignatureReport) {
        if report.status != SignatureStatus::Valid {
            self.is_valid = false;
        }
        self.signatures.push(report);
    }

    /// Human-readable report
    pub fn report(&self) -> String {
        let mut out = String::new();
        let status_icon = if self.is_valid { "[OK]" } else { "[FAILED]" };
        let _ = writeln!(out, "{} {} container", status_icon, self.container_format);

        if self.signatures.is_empty() {
            let _ = writeln!(out, "Signatures: none");
        }
        for signature in &self.signatures {
            let _ = write!(out, "Signature {}: ", signature.id);
            match &signature.status {
                SignatureStatus::Valid => {
                    let _ = writeln!(out, "[VALID]");
                }
                SignatureStatus::Invalid { reason } => {
                    let _ = writeln!(out, "[INVALID] {}", reason);
                }
                SignatureStatus::Untrusted => {
                    let _ = writeln!(out, "[UNTRUSTED]");
                }
            }
            if let Some(id) = &signature.key_id {
                let _ = writeln!(out, "  Key ID: {}", id);
            }
            let _ = writeln!(out, "  Signed: {}", signature.claimed_signing_time);
        }

        if !self.errors.is_empty() {
            let _ = writeln!(out, "Errors:");
            for error in &self.errors {
                let _ = writeln!(out, "  - {}", error);
            }
        }
        if !self.warnings.is_empty() {
            let _ = writeln!(out, "Warnings:");
            for warning in &self.warnings {
                let _ = writeln!(out, "  - {}", warning);
            }
        }
        out
    }
}

/// Print validation result in human-readable format
pub fn print_result(result: &ValidationResult) {
    print!("{}", result.report());
}

/// Writes validation reports into a directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Write JSON and text reports, returning the written paths
    pub fn write(&self, result: &ValidationResult) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::IoError(format!(
                "Failed to create report directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let json = serde_json::to_string_pretty(result)
            .map_err(|e| Error::IoError(format!("Failed to encode report: {}", e)))?;

        let mut written = Vec::new();
        for (name, content) in [(JSON_REPORT, json), (TEXT_REPORT, result.report())] {
            let path = self.dir.join(name);
            fs::write(&path, content).map_err(|e| {
                Error::IoError(format!("Failed to write report {}: {}", path.display(), e))
            })?;
            written.push(path);
        }

        info!("Validation report written to {}", self.dir.display());
        Ok(written)
    }
}
