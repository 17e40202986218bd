//! In-memory reference store backed by `geo` predicates.

use aoi::AreaOfInterest;
use async_trait::async_trait;
use ecohub_common::{EcohubResult, ReferenceLayer};
use geo::{Area, BooleanOps, Intersects, MultiPolygon};

use crate::store::{ReferenceStore, TieBreakPolicy};

#[derive(Debug, Clone)]
struct ReferenceFeature {
    layer: ReferenceLayer,
    label: String,
    geometry: MultiPolygon<f64>,
}

/// Reference features held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceStore {
    features: Vec<ReferenceFeature>,
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature (EPSG:4326) to a layer.
    pub fn insert(
        &mut self,
        layer: ReferenceLayer,
        label: impl Into<String>,
        geometry: impl Into<MultiPolygon<f64>>,
    ) {
        self.features.push(ReferenceFeature {
            layer,
            label: label.into(),
            geometry: geometry.into(),
        });
    }

    /// Builder-style [`InMemoryReferenceStore::insert`].
    pub fn with(
        mut self,
        layer: ReferenceLayer,
        label: impl Into<String>,
        geometry: impl Into<MultiPolygon<f64>>,
    ) -> Self {
        self.insert(layer, label, geometry);
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[async_trait]
impl ReferenceStore for InMemoryReferenceStore {
    async fn intersecting_labels(
        &self,
        layer: ReferenceLayer,
        aoi: &AreaOfInterest,
        limit: usize,
        order: TieBreakPolicy,
    ) -> EcohubResult<Vec<String>> {
        let mut hits: Vec<&ReferenceFeature> = self
            .features
            .iter()
            .filter(|f| f.layer == layer && f.geometry.intersects(aoi.geometry()))
            .collect();

        if order == TieBreakPolicy::LargestOverlap {
            let overlap = |f: &ReferenceFeature| f.geometry.intersection(aoi.geometry()).unsigned_area();
            // Stable sort keeps insertion order among equal overlaps.
            hits.sort_by(|a, b| overlap(b).total_cmp(&overlap(a)));
        }

        Ok(hits
            .into_iter()
            .take(limit)
            .map(|f| f.label.clone())
            .collect())
    }

    async fn ping(&self) -> EcohubResult<()> {
        Ok(())
    }
}
