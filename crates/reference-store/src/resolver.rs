//! Spatial Reference Resolver: one intersects query per reference layer.

use std::sync::Arc;

use aoi::AreaOfInterest;
use ecohub_common::{EcohubResult, ReferenceLayer, SpatialMatch, NOT_IDENTIFIED};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::store::{ReferenceStore, TieBreakPolicy};

/// Resolver settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum protected areas reported.
    pub protected_area_limit: usize,
    /// Ordering used to pick the single country / ecological zone.
    pub tie_break: TieBreakPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            protected_area_limit: 5,
            tie_break: TieBreakPolicy::StoreOrder,
        }
    }
}

/// The reference labels for one AOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialReferences {
    pub country: String,
    pub ecological_zone: String,
    pub protected_areas: Vec<String>,
}

impl SpatialReferences {
    /// Sentinels for both single-match layers and no protected areas.
    pub fn not_identified() -> Self {
        Self {
            country: NOT_IDENTIFIED.to_string(),
            ecological_zone: NOT_IDENTIFIED.to_string(),
            protected_areas: Vec::new(),
        }
    }

    /// Flatten into matches, skipping sentinel labels.
    pub fn matches(&self) -> Vec<SpatialMatch> {
        let mut out = Vec::with_capacity(2 + self.protected_areas.len());
        if self.country != NOT_IDENTIFIED {
            out.push(SpatialMatch::new(ReferenceLayer::Country, &self.country));
        }
        if self.ecological_zone != NOT_IDENTIFIED {
            out.push(SpatialMatch::new(ReferenceLayer::EcologicalZone, &self.ecological_zone));
        }
        out.extend(
            self.protected_areas
                .iter()
                .map(|label| SpatialMatch::new(ReferenceLayer::ProtectedArea, label)),
        );
        out
    }
}

/// Resolves an AOI against the three reference layers.
#[derive(Clone)]
pub struct SpatialReferenceResolver {
    store: Arc<dyn ReferenceStore>,
    config: ResolverConfig,
}

impl SpatialReferenceResolver {
    pub fn new(store: Arc<dyn ReferenceStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn ReferenceStore> {
        &self.store
    }

    /// Query all layers concurrently. Any store failure fails the whole
    /// resolution; empty layers yield sentinels.
    #[instrument(skip(self, aoi))]
    pub async fn resolve(&self, aoi: &AreaOfInterest) -> EcohubResult<SpatialReferences> {
        let tie_break = self.config.tie_break;
        let (country, zone, protected) = tokio::try_join!(
            self.store
                .intersecting_labels(ReferenceLayer::Country, aoi, 1, tie_break),
            self.store
                .intersecting_labels(ReferenceLayer::EcologicalZone, aoi, 1, tie_break),
            self.store.intersecting_labels(
                ReferenceLayer::ProtectedArea,
                aoi,
                self.config.protected_area_limit,
                TieBreakPolicy::StoreOrder,
            ),
        )?;

        let references = SpatialReferences {
            country: first_or_sentinel(country),
            ecological_zone: first_or_sentinel(zone),
            protected_areas: protected,
        };
        debug!(
            country = %references.country,
            ecological_zone = %references.ecological_zone,
            protected_areas = references.protected_areas.len(),
            "Resolved spatial references"
        );
        Ok(references)
    }
}

fn first_or_sentinel(labels: Vec<String>) -> String {
    labels
        .into_iter()
        .next()
        .unwrap_or_else(|| NOT_IDENTIFIED.to_string())
}
