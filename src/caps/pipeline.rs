//! OSS to W3C capability derivation.
//!
//! Turns one flat capability map into a W3C `alwaysMatch`/`firstMatch`
//! pair:
//!
//! 1. vendor filters claim the keys they own; each claimed sub-map becomes
//!    a `firstMatch` alternative
//! 2. unclaimed keys form `alwaysMatch`; when nothing is claimed the whole
//!    map becomes the single `firstMatch` entry
//! 3. the transform chain runs over every map (proxy normalization,
//!    wildcard stripping, platform-name derivation, null removal)
//! 4. surviving keys are rewritten against the accepted-key registry
//!
//! Output maps iterate in sorted key order, so the same input always
//! produces byte-identical candidates.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::registry::KeyRegistry;
use super::transform::{self, CapabilityTransform};
use super::vendor::{self, VendorFilter};
use super::Capabilities;

/// A derived W3C capability pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedCaps {
    /// Capabilities shared by every alternative.
    pub always_match: Capabilities,
    /// Alternative capability sets, tried in order by the server.
    pub first_match: Vec<Capabilities>,
}

impl DerivedCaps {
    /// Flatten back into one map: `alwaysMatch` merged with the first
    /// alternative. Used to synthesize an OSS map from W3C-only input.
    pub fn flattened(&self) -> Capabilities {
        let mut flat = self.always_match.clone();
        if let Some(first) = self.first_match.first() {
            flat.merge(first);
        }
        flat
    }
}

/// Derives W3C capability pairs from flat OSS maps.
pub struct TransformPipeline {
    filters: Vec<Box<dyn VendorFilter>>,
    transforms: Vec<Box<dyn CapabilityTransform>>,
    registry: Arc<KeyRegistry>,
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl TransformPipeline {
    /// Pipeline with the standard filters, transforms and key registry.
    pub fn standard() -> Self {
        Self::with_registry(Arc::new(KeyRegistry::standard()))
    }

    /// Standard filters and transforms over a caller-supplied registry.
    pub fn with_registry(registry: Arc<KeyRegistry>) -> Self {
        Self {
            filters: vendor::standard_filters(),
            transforms: transform::standard_transforms(),
            registry,
        }
    }

    /// Register an additional vendor filter.
    pub fn with_filter(mut self, filter: Box<dyn VendorFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append a transform to the chain.
    pub fn with_transform(mut self, transform: Box<dyn CapabilityTransform>) -> Self {
        self.transforms.push(transform);
        self
    }

    /// The accepted-key registry this pipeline rewrites against.
    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    /// Derive the W3C pair for a flat capability map.
    pub fn derive(&self, oss: &Capabilities) -> DerivedCaps {
        let mut claimed: Vec<Capabilities> = Vec::new();
        let mut used_keys: HashSet<String> = HashSet::new();

        for filter in &self.filters {
            if let Some(sub) = filter.extract(oss) {
                debug!(filter = filter.name(), keys = sub.len(), "vendor filter claimed keys");
                used_keys.extend(sub.keys().cloned());
                claimed.push(sub);
            }
        }

        let (always_src, first_src) = if claimed.is_empty() {
            (Capabilities::new(), vec![oss.clone()])
        } else {
            let unclaimed: Capabilities = oss
                .iter()
                .filter(|(key, _)| !used_keys.contains(*key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            (unclaimed, claimed)
        };

        let always_match = self.finish(&always_src);
        let first_match = first_src.iter().map(|m| self.finish(m)).collect();

        DerivedCaps {
            always_match,
            first_match,
        }
    }

    /// Transform chain plus registry rewrite for one map.
    fn finish(&self, caps: &Capabilities) -> Capabilities {
        self.registry
            .rewrite_map(&transform::apply_all(&self.transforms, caps))
    }
}
