//! The reference store seam.

use aoi::AreaOfInterest;
use async_trait::async_trait;
use ecohub_common::{EcohubResult, ReferenceLayer};
use serde::{Deserialize, Serialize};

/// How to order features when more intersect than the limit allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// Whatever order the store returns rows in.
    #[default]
    StoreOrder,
    /// Largest intersection area with the AOI first.
    LargestOverlap,
}

/// Trait for stores holding the reference layers.
///
/// Zero intersecting features is an empty result, not an error.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Labels of up to `limit` features of `layer` that intersect the AOI.
    async fn intersecting_labels(
        &self,
        layer: ReferenceLayer,
        aoi: &AreaOfInterest,
        limit: usize,
        order: TieBreakPolicy,
    ) -> EcohubResult<Vec<String>>;

    /// Check that the store is reachable.
    async fn ping(&self) -> EcohubResult<()>;
}
