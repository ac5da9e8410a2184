// src/manifest.rs
//! Container manifest (META-INF/manifest.xml) parsing and data structures
//!
//! The manifest lists every data file packaged in an ASiC container together
//! with its declared media type. Paths are unique; the root entry (`/`) that
//! carries the container mimetype is never stored as a data file entry.

use crate::error::{Error, Result};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use tracing::error;

/// Location of the manifest inside a container
pub const MANIFEST_PATH: &str = "META-INF/manifest.xml";

/// Root path entry; describes the container itself, not a data file
pub const ROOT_PATH: &str = "/";

const FILE_ENTRY: &[u8] = b"manifest:file-entry";
const FULL_PATH: &[u8] = b"manifest:full-path";
const MEDIA_TYPE: &[u8] = b"manifest:media-type";
const MANIFEST_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";

/// A single manifest row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    path: String,
    media_type: String,
}

impl ManifestEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }
}

/// Mapping from data file path to its manifest entry
///
/// Lookup is order independent; insertion order is kept for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: HashMap<String, ManifestEntry>,
    order: Vec<String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest XML, processing file entries in document order
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut manifest = Manifest::new();
        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut root_closed = false;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| malformed(&reader, e))?;

            match event {
                Event::Start(element) => {
                    if depth == 0 && root_closed {
                        return Err(Error::MalformedManifest(
                            "multiple root elements".to_string(),
                        ));
                    }
                    if depth == 1 && element.name().as_ref() == FILE_ENTRY {
                        manifest.add_file_entry(&element)?;
                    }
                    depth += 1;
                }
                Event::Empty(element) => {
                    if depth == 0 {
                        // A self-closing root holds no entries
                        if root_closed {
                            return Err(Error::MalformedManifest(
                                "multiple root elements".to_string(),
                            ));
                        }
                        root_closed = true;
                    } else if depth == 1 && element.name().as_ref() == FILE_ENTRY {
                        manifest.add_file_entry(&element)?;
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        root_closed = true;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if depth != 0 {
            return Err(Error::MalformedManifest(
                "unexpected end of document".to_string(),
            ));
        }
        if !root_closed {
            return Err(Error::MalformedManifest("no root element".to_string()));
        }

        Ok(manifest)
    }

    /// Build a manifest describing the given `(path, media type)` pairs
    pub fn for_data_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut manifest = Manifest::new();
        for (path, media_type) in files {
            manifest.insert(path, media_type)?;
        }
        Ok(manifest)
    }

    /// Insert an entry; the root path is skipped, duplicates are rejected
    pub fn insert(&mut self, path: &str, media_type: &str) -> Result<()> {
        if path == ROOT_PATH {
            return Ok(());
        }
        if path.is_empty() {
            return Err(Error::MalformedManifest("empty file entry path".to_string()));
        }
        if self.entries.contains_key(path) {
            let err = Error::DuplicateEntry(path.to_string());
            error!("{}", err);
            return Err(err);
        }

        self.entries.insert(
            path.to_string(),
            ManifestEntry {
                path: path.to_string(),
                media_type: media_type.to_string(),
            },
        );
        self.order.push(path.to_string());
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion (document) order
    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.order.iter().filter_map(|path| self.entries.get(path))
    }

    /// Render as manifest XML with the root entry carrying `container_mimetype`
    pub fn to_xml(&self, container_mimetype: &str) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\" ?>\n");
        xml.push_str(&format!(
            "<manifest:manifest xmlns:manifest=\"{}\" manifest:version=\"1.2\">\n",
            MANIFEST_NAMESPACE
        ));
        xml.push_str(&file_entry_xml(ROOT_PATH, container_mimetype));
        for entry in self.iter() {
            xml.push_str(&file_entry_xml(&entry.path, &entry.media_type));
        }
        xml.push_str("</manifest:manifest>\n");
        xml
    }

    fn add_file_entry(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let mut full_path = None;
        let mut media_type = None;

        for attr in element.attributes() {
            let attr = attr.map_err(|e| Error::MalformedManifest(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| Error::MalformedManifest(e.to_string()))?
                .into_owned();
            match attr.key.as_ref() {
                FULL_PATH => full_path = Some(value),
                MEDIA_TYPE => media_type = Some(value),
                _ => {}
            }
        }

        let full_path = full_path.ok_or_else(|| {
            Error::MalformedManifest("file entry without manifest:full-path".to_string())
        })?;
        let media_type = media_type.ok_or_else(|| {
            Error::MalformedManifest(format!(
                "file entry {} without manifest:media-type",
                full_path
            ))
        })?;

        self.insert(&full_path, &media_type)
    }
}

fn file_entry_xml(path: &str, media_type: &str) -> String {
    format!(
        "<manifest:file-entry manifest:full-path=\"{}\" manifest:media-type=\"{}\"/>\n",
        escape(path),
        escape(media_type)
    )
}

fn malformed(reader: &Reader<&[u8]>, e: quick_xml::Error) -> Error {
    Error::MalformedManifest(format!(
        "at position {}: {}",
        reader.buffer_position(),
        e
    ))
}
