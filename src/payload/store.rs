//! Spooled storage for the raw new-session document.

use std::io::{self, Read, Seek, SeekFrom};

use tempfile::SpooledTempFile;

use crate::caps::Capabilities;
use crate::error::{Result, SessionError};

/// In-memory buffer limit before a payload spills to disk.
pub const DEFAULT_SPILL_THRESHOLD: usize = 4 * 1024 * 1024;

/// Re-readable holder of the raw new-session JSON document.
///
/// Capability documents can reach tens of megabytes (embedded app payloads,
/// install bundles), and negotiation needs to re-read the document once per
/// candidate encoding. The store keeps small documents in memory and rolls
/// larger ones over to an unnamed temporary file. The file is removed when
/// the store drops, on every exit path.
///
/// Construction verifies the document is well-formed JSON with a streaming
/// parse, so malformed input fails before any candidate is attempted.
pub struct PayloadStore {
    file: SpooledTempFile,
    len: u64,
}

impl PayloadStore {
    /// Store a flat capability map as a `desiredCapabilities` document.
    pub fn from_capabilities(caps: &Capabilities) -> Result<Self> {
        Self::from_capabilities_spooled(caps, DEFAULT_SPILL_THRESHOLD)
    }

    /// Store a flat capability map with an explicit spill threshold.
    pub fn from_capabilities_spooled(caps: &Capabilities, spill_threshold: usize) -> Result<Self> {
        let document = serde_json::json!({ "desiredCapabilities": caps });
        let mut file = SpooledTempFile::new(spill_threshold);
        serde_json::to_writer(&mut file, &document)?;
        let len = file.stream_position()?;
        // Built from a serializable map, well-formed by construction.
        Ok(Self { file, len })
    }

    /// Store a raw JSON document.
    pub fn from_json(document: &str) -> Result<Self> {
        Self::from_reader_spooled(document.as_bytes(), DEFAULT_SPILL_THRESHOLD)
    }

    /// Store a raw JSON document streamed from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::from_reader_spooled(reader, DEFAULT_SPILL_THRESHOLD)
    }

    /// Store a raw JSON document with an explicit spill threshold.
    pub fn from_reader_spooled(mut reader: impl Read, spill_threshold: usize) -> Result<Self> {
        let mut file = SpooledTempFile::new(spill_threshold);
        let len = io::copy(&mut reader, &mut file)?;
        let mut store = Self { file, len };
        store.check_well_formed()?;
        Ok(store)
    }

    /// A fresh read of the document from the start.
    pub fn reader(&mut self) -> Result<impl Read + '_> {
        self.file.seek(SeekFrom::Start(0))?;
        Ok(io::BufReader::new(&mut self.file))
    }

    /// Document length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the document rolled over to a temp file.
    pub fn is_spilled(&self) -> bool {
        self.file.is_rolled()
    }

    /// Streaming well-formedness check; nothing is materialized.
    fn check_well_formed(&mut self) -> Result<()> {
        let reader = self.reader()?;
        serde_json::from_reader::<_, serde::de::IgnoredAny>(reader)
            .map_err(|e| SessionError::MalformedPayload(e.to_string()))?;
        Ok(())
    }
}

impl std::fmt::Debug for PayloadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadStore")
            .field("len", &self.len)
            .field("spilled", &self.is_spilled())
            .finish()
    }
}
