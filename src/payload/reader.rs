//! Targeted extraction of capability regions.
//!
//! Each extraction is one streaming read pass over the store with a
//! deserialization target that names only the wanted region; serde skips
//! everything else without building it. Three regions exist:
//!
//! | Region                      | Dialect | Shape            |
//! |-----------------------------|---------|------------------|
//! | `desiredCapabilities`       | OSS     | flat map         |
//! | `capabilities.alwaysMatch`  | W3C     | map              |
//! | `capabilities.firstMatch`   | W3C     | array of maps    |
//!
//! An absent region is `None`, never an error. A region of the wrong shape
//! (or a document that stopped being parseable) is a malformed payload.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::caps::Capabilities;
use crate::error::{Result, SessionError};

use super::store::PayloadStore;

/// Extracts capability regions from a [`PayloadStore`].
pub struct CapabilityReader;

#[derive(Deserialize)]
struct OssEnvelope {
    #[serde(rename = "desiredCapabilities")]
    desired_capabilities: Option<Capabilities>,
}

#[derive(Deserialize)]
struct AlwaysEnvelope {
    capabilities: Option<AlwaysRegion>,
}

#[derive(Deserialize)]
struct AlwaysRegion {
    #[serde(rename = "alwaysMatch")]
    always_match: Option<Capabilities>,
}

#[derive(Deserialize)]
struct FirstEnvelope {
    capabilities: Option<FirstRegion>,
}

#[derive(Deserialize)]
struct FirstRegion {
    #[serde(rename = "firstMatch")]
    first_match: Option<Vec<Capabilities>>,
}

impl CapabilityReader {
    /// The flat OSS `desiredCapabilities` map, when present.
    pub fn desired(store: &mut PayloadStore) -> Result<Option<Capabilities>> {
        let envelope: OssEnvelope = Self::parse(store)?;
        Ok(envelope.desired_capabilities)
    }

    /// The W3C `capabilities.alwaysMatch` map, when present.
    pub fn always_match(store: &mut PayloadStore) -> Result<Option<Capabilities>> {
        let envelope: AlwaysEnvelope = Self::parse(store)?;
        Ok(envelope.capabilities.and_then(|region| region.always_match))
    }

    /// The W3C `capabilities.firstMatch` array, when present.
    pub fn first_match(store: &mut PayloadStore) -> Result<Option<Vec<Capabilities>>> {
        let envelope: FirstEnvelope = Self::parse(store)?;
        Ok(envelope.capabilities.and_then(|region| region.first_match))
    }

    fn parse<T: DeserializeOwned>(store: &mut PayloadStore) -> Result<T> {
        let reader = store.reader()?;
        serde_json::from_reader(reader).map_err(|e| SessionError::MalformedPayload(e.to_string()))
    }
}
