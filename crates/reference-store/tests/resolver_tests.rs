//! Tests for the spatial reference resolver against the in-memory store.

use std::sync::Arc;

use aoi::AreaOfInterest;
use async_trait::async_trait;
use ecohub_common::{CrsCode, EcohubError, EcohubResult, ReferenceLayer, NOT_IDENTIFIED};
use reference_store::{
    InMemoryReferenceStore, ReferenceStore, ResolverConfig, SpatialReferenceResolver,
    TieBreakPolicy,
};
use test_utils::{fixtures, multi, rect_polygon, square_polygon};

fn acre_aoi() -> AreaOfInterest {
    let (min_x, min_y, max_x, max_y) = fixtures::bbox::ACRE_PLOT;
    AreaOfInterest::new(multi(vec![rect_polygon(min_x, min_y, max_x, max_y)]), CrsCode::Epsg4326)
        .unwrap()
}

fn ocean_aoi() -> AreaOfInterest {
    let (min_x, min_y, max_x, max_y) = fixtures::bbox::SOUTH_ATLANTIC;
    AreaOfInterest::new(multi(vec![rect_polygon(min_x, min_y, max_x, max_y)]), CrsCode::Epsg4326)
        .unwrap()
}

fn south_america_store() -> InMemoryReferenceStore {
    InMemoryReferenceStore::new()
        .with(
            ReferenceLayer::Country,
            "Brazil",
            rect_polygon(-74.0, -34.0, -34.0, 5.0),
        )
        .with(
            ReferenceLayer::EcologicalZone,
            "Tropical rainforest",
            rect_polygon(-75.0, -15.0, -45.0, 5.0),
        )
        .with(
            ReferenceLayer::ProtectedArea,
            "Extractive Reserve",
            square_polygon(-69.7, -10.7, 0.2),
        )
}

// ============================================================================
// Matches and sentinels
// ============================================================================

#[tokio::test]
async fn test_resolves_all_layers() {
    let resolver = SpatialReferenceResolver::new(
        Arc::new(south_america_store()),
        ResolverConfig::default(),
    );
    let refs = resolver.resolve(&acre_aoi()).await.unwrap();

    assert_eq!(refs.country, "Brazil");
    assert_eq!(refs.ecological_zone, "Tropical rainforest");
    assert_eq!(refs.protected_areas, vec!["Extractive Reserve".to_string()]);
    assert_eq!(refs.matches().len(), 3);
}

#[tokio::test]
async fn test_aoi_outside_everything_yields_sentinels() {
    let resolver = SpatialReferenceResolver::new(
        Arc::new(south_america_store()),
        ResolverConfig::default(),
    );
    let refs = resolver.resolve(&ocean_aoi()).await.unwrap();

    assert_eq!(refs.country, NOT_IDENTIFIED);
    assert_eq!(refs.ecological_zone, NOT_IDENTIFIED);
    assert!(refs.protected_areas.is_empty());
    assert!(refs.matches().is_empty());
}

#[tokio::test]
async fn test_protected_areas_truncated_to_limit() {
    let mut store = south_america_store();
    for i in 0..6 {
        store.insert(
            ReferenceLayer::ProtectedArea,
            format!("Area {}", i),
            square_polygon(-69.8 + i as f64 * 0.01, -10.8, 0.5),
        );
    }
    assert_eq!(store.len(), 9);

    let resolver = SpatialReferenceResolver::new(Arc::new(store), ResolverConfig::default());
    let refs = resolver.resolve(&acre_aoi()).await.unwrap();

    // 7 intersect; the first 5 in store order come back.
    assert_eq!(refs.protected_areas.len(), 5);
    assert_eq!(refs.protected_areas[0], "Extractive Reserve");
    assert_eq!(refs.protected_areas[4], "Area 3");
}

// ============================================================================
// Tie-break policy
// ============================================================================

#[tokio::test]
async fn test_tie_break_policies() {
    // The AOI straddles a border: a sliver of "Peru" comes first in store
    // order, but most of the AOI lies in "Brazil".
    let store = InMemoryReferenceStore::new()
        .with(ReferenceLayer::Country, "Peru", rect_polygon(-75.0, -12.0, -69.55, -9.0))
        .with(ReferenceLayer::Country, "Brazil", rect_polygon(-69.55, -12.0, -60.0, -9.0));
    let store: Arc<dyn ReferenceStore> = Arc::new(store);

    let store_order = SpatialReferenceResolver::new(store.clone(), ResolverConfig::default());
    assert_eq!(store_order.resolve(&acre_aoi()).await.unwrap().country, "Peru");

    let largest = SpatialReferenceResolver::new(
        store,
        ResolverConfig {
            tie_break: TieBreakPolicy::LargestOverlap,
            ..ResolverConfig::default()
        },
    );
    assert_eq!(largest.resolve(&acre_aoi()).await.unwrap().country, "Brazil");
}

// ============================================================================
// Failures
// ============================================================================

struct DownStore;

#[async_trait]
impl ReferenceStore for DownStore {
    async fn intersecting_labels(
        &self,
        layer: ReferenceLayer,
        _aoi: &AreaOfInterest,
        _limit: usize,
        _order: TieBreakPolicy,
    ) -> EcohubResult<Vec<String>> {
        match layer {
            ReferenceLayer::ProtectedArea => Err(EcohubError::ReferenceStoreUnavailable(
                "connection refused".into(),
            )),
            _ => Ok(vec![]),
        }
    }

    async fn ping(&self) -> EcohubResult<()> {
        Err(EcohubError::ReferenceStoreUnavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_store_failure_fails_resolution() {
    let resolver = SpatialReferenceResolver::new(Arc::new(DownStore), ResolverConfig::default());
    let err = resolver.resolve(&acre_aoi()).await.unwrap_err();
    assert!(matches!(err, EcohubError::ReferenceStoreUnavailable(_)));
}
