//! Candidate encodings of the new-session request.
//!
//! Three body shapes exist, tried from most to least inclusive. The
//! combined body serves servers of either dialect; the single-dialect
//! bodies follow for strict servers that reject unknown top-level members
//! (a strict W3C server may refuse a body carrying `desiredCapabilities`).
//!
//! Candidates are produced lazily and each one re-reads the payload store,
//! so nothing is cached across attempts beyond the store's own buffer.

use bytes::Bytes;
use serde_json::json;

use crate::caps::{validate, Capabilities, DerivedCaps, KeyRegistry, TransformPipeline};
use crate::error::Result;
use crate::payload::{CapabilityReader, PayloadStore};

use super::Dialect;

/// Body shape of one candidate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Both dialects in one body.
    Combined,
    /// Legacy body only: `desiredCapabilities` plus an empty
    /// `requiredCapabilities`.
    OssOnly,
    /// W3C body only: the `capabilities` object.
    W3cOnly,
}

impl Encoding {
    /// Attempt order.
    pub const ORDER: [Encoding; 3] = [Encoding::Combined, Encoding::OssOnly, Encoding::W3cOnly];

    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Combined => "combined",
            Self::OssOnly => "oss-only",
            Self::W3cOnly => "w3c-only",
        }
    }

    /// The single-dialect encoding for a pinned dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Oss => Self::OssOnly,
            Dialect::W3c => Self::W3cOnly,
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One fully-formed candidate: the capability maps in their body shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateSet {
    /// Both dialects in one body.
    Combined {
        /// Flat OSS map.
        desired: Capabilities,
        /// W3C common part.
        always_match: Capabilities,
        /// W3C alternatives.
        first_match: Vec<Capabilities>,
    },
    /// Legacy body only.
    OssOnly {
        /// Flat OSS map.
        desired: Capabilities,
    },
    /// W3C body only.
    W3cOnly {
        /// W3C common part.
        always_match: Capabilities,
        /// W3C alternatives.
        first_match: Vec<Capabilities>,
    },
}

impl CandidateSet {
    /// The body shape of this candidate.
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Combined { .. } => Encoding::Combined,
            Self::OssOnly { .. } => Encoding::OssOnly,
            Self::W3cOnly { .. } => Encoding::W3cOnly,
        }
    }

    /// Structural validation, run once before the candidate goes on the
    /// wire. An invalid candidate is skipped without network contact.
    pub fn validate(&self, registry: &KeyRegistry) -> Result<()> {
        match self {
            Self::Combined {
                desired,
                always_match,
                first_match,
            } => {
                validate::validate_oss(desired)?;
                validate::validate_w3c_pair(always_match, first_match, registry)
            }
            Self::OssOnly { desired } => validate::validate_oss(desired),
            Self::W3cOnly {
                always_match,
                first_match,
            } => validate::validate_w3c_pair(always_match, first_match, registry),
        }
    }

    /// Serialize the request body.
    ///
    /// The legacy body always carries an empty `requiredCapabilities`
    /// member; old servers expect it to exist.
    pub fn encode(&self) -> Result<Bytes> {
        let body = match self {
            Self::Combined {
                desired,
                always_match,
                first_match,
            } => json!({
                "desiredCapabilities": desired,
                "capabilities": {
                    "alwaysMatch": always_match,
                    "firstMatch": first_match,
                },
            }),
            Self::OssOnly { desired } => json!({
                "desiredCapabilities": desired,
                "requiredCapabilities": {},
            }),
            Self::W3cOnly {
                always_match,
                first_match,
            } => json!({
                "capabilities": {
                    "alwaysMatch": always_match,
                    "firstMatch": first_match,
                },
            }),
        };
        Ok(Bytes::from(serde_json::to_vec(&body)?))
    }
}

/// Lazy, ordered producer of candidates over a payload store.
///
/// Every `next()` re-extracts the regions it needs from the store, deriving
/// the missing dialect's maps on the fly: a W3C pair comes from the
/// transform pipeline when the caller only sent `desiredCapabilities`, and
/// a flat map is synthesized from `alwaysMatch` plus the first alternative
/// when the caller only sent W3C regions.
pub struct CandidateStream<'a> {
    store: &'a mut PayloadStore,
    pipeline: &'a TransformPipeline,
    order: Vec<Encoding>,
    next: usize,
}

impl<'a> CandidateStream<'a> {
    /// Stream over the full attempt order.
    pub fn new(store: &'a mut PayloadStore, pipeline: &'a TransformPipeline) -> Self {
        Self {
            store,
            pipeline,
            order: Encoding::ORDER.to_vec(),
            next: 0,
        }
    }

    /// Stream restricted to one dialect's encoding.
    pub fn pinned(
        store: &'a mut PayloadStore,
        pipeline: &'a TransformPipeline,
        dialect: Dialect,
    ) -> Self {
        Self {
            store,
            pipeline,
            order: vec![Encoding::for_dialect(dialect)],
            next: 0,
        }
    }

    /// The untransformed capabilities as the caller supplied them, for
    /// diagnostics and error reporting.
    pub fn original(&mut self) -> Result<Capabilities> {
        self.oss_map()
    }

    /// The flat map: the document's `desiredCapabilities`, or a merge of
    /// the W3C regions when only those were supplied.
    fn oss_map(&mut self) -> Result<Capabilities> {
        if let Some(desired) = CapabilityReader::desired(self.store)? {
            return Ok(desired);
        }
        let derived = DerivedCaps {
            always_match: CapabilityReader::always_match(self.store)?.unwrap_or_default(),
            first_match: CapabilityReader::first_match(self.store)?.unwrap_or_default(),
        };
        Ok(derived.flattened())
    }

    /// The W3C pair: the document's own regions when any is present,
    /// otherwise derived from the flat map through the pipeline. An absent
    /// `firstMatch` next to a present `alwaysMatch` defaults to one empty
    /// alternative; an explicitly empty array is kept and fails validation.
    fn w3c_pair(&mut self) -> Result<(Capabilities, Vec<Capabilities>)> {
        let always = CapabilityReader::always_match(self.store)?;
        let first = CapabilityReader::first_match(self.store)?;
        if always.is_some() || first.is_some() {
            let first = first.unwrap_or_else(|| vec![Capabilities::new()]);
            return Ok((always.unwrap_or_default(), first));
        }

        let desired = CapabilityReader::desired(self.store)?.unwrap_or_default();
        let derived = self.pipeline.derive(&desired);
        Ok((derived.always_match, derived.first_match))
    }

    fn build(&mut self, encoding: Encoding) -> Result<CandidateSet> {
        match encoding {
            Encoding::Combined => {
                let desired = self.oss_map()?;
                let (always_match, first_match) = self.w3c_pair()?;
                Ok(CandidateSet::Combined {
                    desired,
                    always_match,
                    first_match,
                })
            }
            Encoding::OssOnly => Ok(CandidateSet::OssOnly {
                desired: self.oss_map()?,
            }),
            Encoding::W3cOnly => {
                let (always_match, first_match) = self.w3c_pair()?;
                Ok(CandidateSet::W3cOnly {
                    always_match,
                    first_match,
                })
            }
        }
    }
}

impl Iterator for CandidateStream<'_> {
    type Item = Result<CandidateSet>;

    fn next(&mut self) -> Option<Self::Item> {
        let encoding = *self.order.get(self.next)?;
        self.next += 1;
        Some(self.build(encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn oss_store() -> PayloadStore {
        PayloadStore::from_json(
            &json!({
                "desiredCapabilities": {"platformName": "iOS", "cherries": "sweet"}
            })
            .to_string(),
        )
        .unwrap()
    }

    fn body_of(candidate: &CandidateSet) -> Value {
        serde_json::from_slice(&candidate.encode().unwrap()).unwrap()
    }

    #[test]
    fn test_attempt_order() {
        let mut store = oss_store();
        let pipeline = TransformPipeline::standard();
        let encodings: Vec<Encoding> = CandidateStream::new(&mut store, &pipeline)
            .map(|c| c.unwrap().encoding())
            .collect();
        assert_eq!(
            encodings,
            [Encoding::Combined, Encoding::OssOnly, Encoding::W3cOnly]
        );
    }

    #[test]
    fn test_combined_carries_both_dialects() {
        let mut store = oss_store();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .next()
            .unwrap()
            .unwrap();

        let body = body_of(&candidate);
        assert_eq!(body["desiredCapabilities"]["cherries"], "sweet");
        assert_eq!(
            body["capabilities"]["firstMatch"][0]["appium:cherries"],
            "sweet"
        );
    }

    #[test]
    fn test_oss_body_shape() {
        let mut store = oss_store();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .nth(1)
            .unwrap()
            .unwrap();

        let body = body_of(&candidate);
        assert_eq!(body["desiredCapabilities"]["platformName"], "iOS");
        assert_eq!(body["requiredCapabilities"], json!({}));
        assert!(body.get("capabilities").is_none());
    }

    #[test]
    fn test_w3c_body_shape() {
        let mut store = oss_store();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .nth(2)
            .unwrap()
            .unwrap();

        let body = body_of(&candidate);
        assert!(body.get("desiredCapabilities").is_none());
        assert!(body.get("requiredCapabilities").is_none());
        assert_eq!(
            body["capabilities"]["firstMatch"][0]["platformName"],
            "iOS"
        );
    }

    #[test]
    fn test_flat_map_synthesized_from_w3c_regions() {
        let mut store = PayloadStore::from_json(
            &json!({
                "capabilities": {
                    "alwaysMatch": {"platformName": "Android"},
                    "firstMatch": [{"appium:automationName": "UiAutomator2"}]
                }
            })
            .to_string(),
        )
        .unwrap();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .nth(1)
            .unwrap()
            .unwrap();

        let body = body_of(&candidate);
        assert_eq!(body["desiredCapabilities"]["platformName"], "Android");
        assert_eq!(
            body["desiredCapabilities"]["appium:automationName"],
            "UiAutomator2"
        );
    }

    #[test]
    fn test_caller_w3c_regions_used_verbatim() {
        let mut store = PayloadStore::from_json(
            &json!({
                "desiredCapabilities": {"cherries": "sweet"},
                "capabilities": {"alwaysMatch": {"platformName": "iOS"}}
            })
            .to_string(),
        )
        .unwrap();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .nth(2)
            .unwrap()
            .unwrap();

        let body = body_of(&candidate);
        // Caller supplied a W3C region, so no derivation from the flat map.
        assert_eq!(body["capabilities"]["alwaysMatch"]["platformName"], "iOS");
        assert_eq!(body["capabilities"]["firstMatch"], json!([{}]));
    }

    #[test]
    fn test_pinned_stream_single_candidate() {
        let mut store = oss_store();
        let pipeline = TransformPipeline::standard();
        let candidates: Vec<CandidateSet> = CandidateStream::pinned(&mut store, &pipeline, Dialect::Oss)
            .map(|c| c.unwrap())
            .collect();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].encoding(), Encoding::OssOnly);
    }

    #[test]
    fn test_explicit_empty_first_match_fails_validation() {
        let mut store = PayloadStore::from_json(
            &json!({
                "capabilities": {"alwaysMatch": {"platformName": "iOS"}, "firstMatch": []}
            })
            .to_string(),
        )
        .unwrap();
        let pipeline = TransformPipeline::standard();
        let candidate = CandidateStream::new(&mut store, &pipeline)
            .nth(2)
            .unwrap()
            .unwrap();

        assert!(candidate.validate(pipeline.registry()).is_err());
    }
}
