// src/container/format.rs

//! Container format detection
//!
//! The logical format comes from an explicit type hint when one is given,
//! otherwise from the input file name. Resolution never touches the
//! filesystem, so the same inputs always give the same format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ContainerFormat {
    /// Single data file, single signature or timestamp token
    Asics,
    /// Multiple data files, multiple signatures
    #[default]
    Asice,
    /// Legacy alias of ASiC-E
    Bdoc,
    /// Legacy DigiDoc container
    Ddoc,
    /// Signature embedded in a PDF document
    Pades,
}

/// File name suffixes, checked in order
const EXTENSIONS: &[(&str, ContainerFormat)] = &[
    (".bdoc", ContainerFormat::Bdoc),
    (".asics", ContainerFormat::Asics),
    (".scs", ContainerFormat::Asics),
    (".asice", ContainerFormat::Asice),
    (".sce", ContainerFormat::Asice),
    (".ddoc", ContainerFormat::Ddoc),
    (".pdf", ContainerFormat::Pades),
];

impl ContainerFormat {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Asics => "ASICS",
            Self::Asice => "ASICE",
            Self::Bdoc => "BDOC",
            Self::Ddoc => "DDOC",
            Self::Pades => "PADES",
        }
    }

    /// Mimetype stored in the container's `mimetype` entry
    pub const fn mimetype(&self) -> &'static str {
        match self {
            Self::Asics => "application/vnd.etsi.asic-s+zip",
            Self::Asice | Self::Bdoc => "application/vnd.etsi.asic-e+zip",
            Self::Ddoc => "application/x-ddoc",
            Self::Pades => "application/pdf",
        }
    }

    /// Whether this is an ASiC archive format
    pub const fn is_asic(&self) -> bool {
        matches!(self, Self::Asics | Self::Asice | Self::Bdoc)
    }

    /// Parse one of the explicit type hints (`BDOC`, `ASICS`, `ASICE`, `DDOC`)
    pub fn from_hint(hint: &str) -> Option<Self> {
        let hint = hint.trim();
        [Self::Bdoc, Self::Asics, Self::Asice, Self::Ddoc]
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(hint))
    }

    /// Match a file name against the known container suffixes
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, format)| *format)
    }

    /// Format recorded in a stored `mimetype` entry
    ///
    /// ASiC-E and BDOC share a mimetype, so the BDOC alias cannot be recovered
    /// from content alone; `fallback` decides between them.
    pub fn from_mimetype(mimetype: &str, fallback: Self) -> Option<Self> {
        match mimetype.trim() {
            "application/vnd.etsi.asic-s+zip" => Some(Self::Asics),
            "application/vnd.etsi.asic-e+zip" => {
                if fallback == Self::Bdoc {
                    Some(Self::Bdoc)
                } else {
                    Some(Self::Asice)
                }
            }
            "application/x-ddoc" => Some(Self::Ddoc),
            "application/pdf" => Some(Self::Pades),
            _ => None,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolve the container format from a type hint and an input path
///
/// First match wins: a recognised hint, then the input path suffix, then
/// ASiC-E. An unrecognised hint falls through to the suffix check.
pub fn resolve(hint: Option<&str>, input_path: Option<&str>) -> ContainerFormat {
    hint.and_then(ContainerFormat::from_hint)
        .or_else(|| input_path.and_then(ContainerFormat::from_path))
        .unwrap_or_default()
}
