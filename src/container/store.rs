// src/container/store.rs
//! Container persistence
//!
//! [`ArchiveStore`] keeps a container as a gzip-compressed tar archive:
//!
//! ```text
//! mimetype
//! META-INF/manifest.xml
//! <data files>
//! META-INF/signatures0.json ... META-INF/signatures{n}.json
//! META-INF/timestamp.json
//! ```
//!
//! PDF files are recognised by their magic bytes and opened as PAdES
//! containers holding the document as their only data file.

use super::{Container, ContainerFormat, DataFile};
use crate::error::{Error, Result};
use crate::manifest::{MANIFEST_PATH, Manifest};
use crate::signing::{Signature, TimestampToken};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tar::{Archive, Builder};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const MIMETYPE_PATH: &str = "mimetype";
const META_INF: &str = "META-INF/";
const SIGNATURE_PREFIX: &str = "META-INF/signatures";
const TIMESTAMP_PATH: &str = "META-INF/timestamp.json";
const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Whether a data file name collides with a container metadata entry
pub(crate) fn is_reserved_entry(name: &str) -> bool {
    name == MIMETYPE_PATH || name.starts_with(META_INF)
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];

/// Default mtime for archive entries (2024-01-01 00:00:00 UTC)
const DEFAULT_MTIME: u64 = 1704067200;

/// Reads and writes containers
pub trait ContainerStore {
    /// Open the container at `path`; absence is [`Error::ContainerNotFound`]
    ///
    /// `format_hint` only disambiguates formats that share a stored mimetype.
    fn open_existing(&self, path: &Path, format_hint: ContainerFormat) -> Result<Container>;

    /// Atomically replace the file at `path` with `container`
    fn save(&self, container: &Container, path: &Path) -> Result<()>;
}

/// tar+gzip container store
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveStore;

impl ContainerStore for ArchiveStore {
    fn open_existing(&self, path: &Path, format_hint: ContainerFormat) -> Result<Container> {
        if !path.is_file() {
            return Err(Error::ContainerNotFound(path.display().to_string()));
        }
        let bytes = fs::read(path).map_err(|e| {
            Error::IoError(format!("Failed to read container {}: {}", path.display(), e))
        })?;

        if bytes.starts_with(PDF_MAGIC) {
            debug!("Opening {} as PAdES document", path.display());
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            return Ok(Container::from_parts(
                ContainerFormat::Pades,
                vec![DataFile::new(name, "application/pdf", bytes)],
                Vec::new(),
                None,
            ));
        }
        if !bytes.starts_with(GZIP_MAGIC) {
            return Err(Error::MalformedContainer(format!(
                "{} is not a container archive",
                path.display()
            )));
        }

        let container = read_archive(&bytes, format_hint)?;
        info!(
            "Opened {} container {} ({} data files, {} signatures)",
            container.format(),
            path.display(),
            container.data_files().len(),
            container.signatures().len()
        );
        Ok(container)
    }

    fn save(&self, container: &Container, path: &Path) -> Result<()> {
        if !container.format().is_asic() {
            return Err(Error::ConfigurationError(format!(
                "{} containers cannot be written",
                container.format()
            )));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir).map_err(|e| {
            Error::IoError(format!("Failed to create temp file in {}: {}", dir.display(), e))
        })?;

        let mut temp = write_archive(container, temp)?;
        temp.as_file_mut().sync_all()?;
        temp.persist(path).map_err(|e| {
            Error::IoError(format!("Failed to save container {}: {}", path.display(), e))
        })?;

        info!("Saved {} container {}", container.format(), path.display());
        Ok(())
    }
}

fn read_archive(bytes: &[u8], format_hint: ContainerFormat) -> Result<Container> {
    let mut archive = Archive::new(GzDecoder::new(bytes));

    let mut mimetype: Option<String> = None;
    let mut manifest: Option<Manifest> = None;
    let mut files: Vec<(String, Vec<u8>)> = Vec::new();
    let mut signatures: BTreeMap<u32, Signature> = BTreeMap::new();
    let mut timestamp: Option<TimestampToken> = None;

    for entry in archive.entries().map_err(malformed)? {
        let mut entry = entry.map_err(malformed)?;
        if entry.header().entry_type().is_dir() {
            continue;
        }
        let entry_path = entry
            .path()
            .map_err(malformed)?
            .to_string_lossy()
            .trim_start_matches("./")
            .to_string();

        let mut content = Vec::new();
        entry.read_to_end(&mut content).map_err(malformed)?;

        if entry_path == MIMETYPE_PATH && mimetype.is_none() {
            mimetype = Some(String::from_utf8_lossy(&content).trim().to_string());
        } else if entry_path == MANIFEST_PATH {
            manifest = Some(Manifest::parse(&content)?);
        } else if entry_path == TIMESTAMP_PATH {
            timestamp = Some(serde_json::from_slice(&content).map_err(|e| {
                Error::MalformedContainer(format!("invalid timestamp token: {}", e))
            })?);
        } else if let Some(index) = signature_index(&entry_path) {
            let signature: Signature = serde_json::from_slice(&content).map_err(|e| {
                Error::MalformedContainer(format!("invalid signature {}: {}", entry_path, e))
            })?;
            signatures.insert(index, signature);
        } else if entry_path.starts_with(META_INF) {
            debug!("Ignoring unknown container entry {}", entry_path);
        } else {
            if files.iter().any(|(name, _)| *name == entry_path) {
                return Err(Error::DuplicateDataFile(entry_path));
            }
            files.push((entry_path, content));
        }
    }

    let mimetype = mimetype
        .ok_or_else(|| Error::MalformedContainer("missing mimetype entry".to_string()))?;
    let format = ContainerFormat::from_mimetype(&mimetype, format_hint)
        .ok_or_else(|| Error::MalformedContainer(format!("unknown mimetype {}", mimetype)))?;
    let manifest = manifest.unwrap_or_default();

    let data_files = order_data_files(files, &manifest);
    if format == ContainerFormat::Asics {
        if data_files.len() > 1 {
            return Err(Error::SingleDataFileExceeded);
        }
        if signatures.len() > 1 {
            return Err(Error::ContainerAlreadySigned);
        }
        if timestamp.is_some() && !signatures.is_empty() {
            return Err(Error::ContainerAlreadyTimestamped);
        }
    }

    Ok(Container::from_parts(
        format,
        data_files,
        signatures.into_values().collect(),
        timestamp,
    ))
}

/// Data files in manifest order, unlisted files last
fn order_data_files(mut files: Vec<(String, Vec<u8>)>, manifest: &Manifest) -> Vec<DataFile> {
    let mut data_files = Vec::with_capacity(files.len());

    for entry in manifest.iter() {
        match files.iter().position(|(name, _)| name == entry.path()) {
            Some(index) => {
                let (name, content) = files.remove(index);
                data_files.push(DataFile::new(name, entry.media_type(), content));
            }
            None => warn!("Manifest entry {} has no data file", entry.path()),
        }
    }
    for (name, content) in files {
        warn!("Data file {} is not listed in the manifest", name);
        data_files.push(DataFile::new(name, DEFAULT_MEDIA_TYPE, content));
    }

    data_files
}

/// `META-INF/signatures{n}.json` -> n
fn signature_index(path: &str) -> Option<u32> {
    path.strip_prefix(SIGNATURE_PREFIX)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

fn write_archive<W: Write>(container: &Container, output: W) -> Result<W> {
    let mtime = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MTIME);

    let encoder = GzEncoder::new(output, Compression::default());
    let mut archive = Builder::new(encoder);

    let manifest = container.manifest()?;
    append(&mut archive, MIMETYPE_PATH, container.format().mimetype().as_bytes(), mtime)?;
    append(
        &mut archive,
        MANIFEST_PATH,
        manifest.to_xml(container.format().mimetype()).as_bytes(),
        mtime,
    )?;
    for file in container.data_files() {
        append(&mut archive, file.name(), file.bytes(), mtime)?;
    }
    for (index, signature) in container.signatures().iter().enumerate() {
        let json = serde_json::to_vec_pretty(signature)
            .map_err(|e| Error::IoError(format!("Failed to encode signature: {}", e)))?;
        let path = format!("{}{}.json", SIGNATURE_PREFIX, index);
        append(&mut archive, &path, &json, mtime)?;
    }
    if let Some(token) = container.timestamp_token() {
        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| Error::IoError(format!("Failed to encode timestamp token: {}", e)))?;
        append(&mut archive, TIMESTAMP_PATH, &json, mtime)?;
    }

    let encoder = archive.into_inner()?;
    Ok(encoder.finish()?)
}

fn append<W: Write>(archive: &mut Builder<W>, path: &str, content: &[u8], mtime: u64) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_mtime(mtime);
    header.set_cksum();

    archive
        .append_data(&mut header, path, content)
        .map_err(|e| Error::IoError(format!("Failed to write container entry {}: {}", path, e)))
}

fn malformed(e: std::io::Error) -> Error {
    Error::MalformedContainer(e.to_string())
}
