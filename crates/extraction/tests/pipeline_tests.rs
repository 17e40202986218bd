//! Full pipeline runs against an in-memory reference store and a mocked
//! STAC API serving GeoTIFF assets.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use aoi::{read_geojson, AreaOfInterest, VectorDataset};
use async_trait::async_trait;
use ecohub_common::{
    CrsCode, EcohubError, EcohubResult, ReferenceLayer, NOT_IDENTIFIED,
};
use extraction::{DegradedPolicy, ExtractionPipeline, PipelineConfig, RasterOutput};
use httpmock::prelude::*;
use raster::{write_geotiff, GeoTransform, HttpAssetFetcher, Raster, RasterExtractor};
use reference_store::{
    InMemoryReferenceStore, ReferenceStore, SpatialReferenceResolver, TieBreakPolicy,
};
use serde_json::Value;
use stac_catalog::{CatalogDiscovery, NoopSigner, StacClient, StacClientConfig};
use test_utils::fixtures::{self, stac};
use test_utils::{assert_approx_eq, constant_grid, polygons_geojson, rect_polygon};

// ============================================================================
// Fixtures
// ============================================================================

struct DownStore;

#[async_trait]
impl ReferenceStore for DownStore {
    async fn intersecting_labels(
        &self,
        _layer: ReferenceLayer,
        _aoi: &AreaOfInterest,
        _limit: usize,
        _order: TieBreakPolicy,
    ) -> EcohubResult<Vec<String>> {
        Err(EcohubError::ReferenceStoreUnavailable(
            "connection refused".into(),
        ))
    }

    async fn ping(&self) -> EcohubResult<()> {
        Err(EcohubError::ReferenceStoreUnavailable(
            "connection refused".into(),
        ))
    }
}

fn acre_store() -> Arc<dyn ReferenceStore> {
    Arc::new(
        InMemoryReferenceStore::new()
            .with(
                ReferenceLayer::Country,
                "Brasil",
                rect_polygon(-74.0, -34.0, -34.0, 5.0),
            )
            .with(
                ReferenceLayer::EcologicalZone,
                "Tropical rainforest",
                rect_polygon(-72.0, -12.0, -66.0, -8.0),
            )
            .with(
                ReferenceLayer::ProtectedArea,
                "Reserva Extrativista Chico Mendes",
                rect_polygon(-69.8, -10.8, -69.5, -10.5),
            ),
    )
}

fn plot_dataset() -> VectorDataset {
    let (min_x, min_y, max_x, max_y) = fixtures::bbox::ACRE_PLOT;
    let text = polygons_geojson(&[rect_polygon(min_x, min_y, max_x, max_y)], None);
    read_geojson(text.as_bytes()).unwrap()
}

/// 0.01 degree grid over (-70.5, -11.5) .. (-68.5, -9.5).
fn acre_geotiff(value: f32) -> Vec<u8> {
    let raster = Raster::new(
        200,
        200,
        constant_grid(200, 200, value),
        GeoTransform::new(-70.5, -9.5, 0.01, 0.01),
        CrsCode::Epsg4326,
    )
    .unwrap();
    let mut cursor = Cursor::new(Vec::new());
    write_geotiff(&raster, &mut cursor).unwrap();
    cursor.into_inner()
}

async fn serve_asset(server: &MockServer, year: i32, value: f32, delay: Duration) {
    let body = acre_geotiff(value);
    server
        .mock_async(move |when, then| {
            when.method(GET).path(format!("/assets/{}.tif", year));
            then.status(200).delay(delay).body(body);
        })
        .await;
}

/// Mount a search answering with one item per year, in the given order.
async fn serve_search<'a>(server: &'a MockServer, years: &[i32]) -> httpmock::Mock<'a> {
    let items: Vec<Value> = years
        .iter()
        .map(|year| {
            stac::biomass_item(
                &format!("chloris-{}", year),
                &format!("{}-01-01T00:00:00Z", year),
                &server.url(format!("/assets/{}.tif", year)),
            )
        })
        .collect();
    let page = stac::item_collection(items, None);
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/search");
            then.status(200).json_body(page);
        })
        .await
}

fn pipeline(
    server: &MockServer,
    store: Arc<dyn ReferenceStore>,
    config: PipelineConfig,
) -> ExtractionPipeline {
    let client = StacClient::new(StacClientConfig {
        base_url: server.base_url(),
        request_timeout: Duration::from_secs(5),
        ..StacClientConfig::default()
    })
    .unwrap();
    let discovery = CatalogDiscovery::new(client, Arc::new(NoopSigner), config.discovery.clone());
    let resolver = SpatialReferenceResolver::new(store, config.resolver);
    let fetcher = HttpAssetFetcher::new(Duration::from_secs(10)).unwrap();
    let extractor = RasterExtractor::new(Arc::new(fetcher), config.extractor.clone());
    ExtractionPipeline::new(resolver, discovery, extractor, config)
}

fn config_with_scratch(dir: &tempfile::TempDir) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.extractor.artifact_dir = Some(dir.path().to_path_buf());
    config
}

// ============================================================================
// Snapshot mode
// ============================================================================

#[tokio::test]
async fn test_snapshot_report() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2016, 2017]).await;
    serve_asset(&server, 2016, 150.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let report = pipeline(&server, acre_store(), config_with_scratch(&scratch))
        .generate_report(&plot_dataset())
        .await
        .unwrap();

    assert_eq!(report.result.pais, "Brasil");
    assert_eq!(report.result.zona_ecologica, "Tropical rainforest");
    assert_eq!(
        report.result.areas_protegidas,
        vec!["Reserva Extrativista Chico Mendes".to_string()]
    );
    assert!(report.result.warnings.is_empty());
    // 0.2 x 0.2 degrees at 10.5S is roughly 48,000 ha.
    assert!(report.result.area_hectares > 45_000.0 && report.result.area_hectares < 50_000.0);

    // First discovered item is the one clipped.
    assert_eq!(report.artifact.item_id(), "chloris-2016");
    assert_approx_eq!(report.artifact.stats().mean, 150.0, 1e-6);
    match &report.result.output {
        RasterOutput::Snapshot { tif_path } => {
            assert_eq!(tif_path, report.artifact.path());
            assert!(tif_path.exists());
        }
        other => panic!("expected snapshot output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_snapshot_persist_rewrites_tif_path() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2018]).await;
    serve_asset(&server, 2018, 42.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let report = pipeline(&server, acre_store(), config_with_scratch(&scratch))
        .generate_report(&plot_dataset())
        .await
        .unwrap();

    let result = report.persist(storage.path()).unwrap();
    let RasterOutput::Snapshot { tif_path } = &result.output else {
        panic!("expected snapshot output");
    };
    assert!(tif_path.starts_with(storage.path()));
    assert!(tif_path.exists());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["tif_path"], Value::String(tif_path.display().to_string()));
    assert!(json.get("biomass_series").is_none());
    assert!(json.get("warnings").is_none());
}

#[tokio::test]
async fn test_snapshot_without_items_is_no_data_found() {
    let server = MockServer::start_async().await;
    let search = serve_search(&server, &[]).await;

    let scratch = tempfile::tempdir().unwrap();
    let err = pipeline(&server, acre_store(), config_with_scratch(&scratch))
        .generate_report(&plot_dataset())
        .await
        .unwrap_err();

    assert!(matches!(err, EcohubError::NoDataFound));
    assert_eq!(err.to_string(), "No image found for this area.");
    search.assert_async().await;
}

#[tokio::test]
async fn test_point_geometry_is_invalid_input() {
    let server = MockServer::start_async().await;
    let search = serve_search(&server, &[2016]).await;

    let dataset =
        read_geojson(br#"{"type": "Point", "coordinates": [-69.5, -10.5]}"#).unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let err = pipeline(&server, acre_store(), config_with_scratch(&scratch))
        .generate_report(&dataset)
        .await
        .unwrap_err();

    assert!(matches!(err, EcohubError::InvalidInput(_)));
    assert_eq!(search.hits_async().await, 0);
}

// ============================================================================
// Series mode
// ============================================================================

#[tokio::test]
async fn test_series_is_sorted_by_year() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2017, 2015, 2016]).await;
    // Earliest year finishes last.
    serve_asset(&server, 2015, 100.0, Duration::from_millis(300)).await;
    serve_asset(&server, 2016, 110.0, Duration::from_millis(150)).await;
    serve_asset(&server, 2017, 120.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let result = pipeline(&server, acre_store(), config_with_scratch(&scratch))
        .biomass_series(&plot_dataset())
        .await
        .unwrap();

    let RasterOutput::Series {
        biomass_series,
        skipped_years,
    } = &result.output
    else {
        panic!("expected series output");
    };
    let years: Vec<i32> = biomass_series.iter().map(|p| p.year).collect();
    assert_eq!(years, vec![2015, 2016, 2017]);
    assert_approx_eq!(biomass_series[0].value, 100.0, 1e-6);
    assert_approx_eq!(biomass_series[2].value, 120.0, 1e-6);
    assert!(skipped_years.is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["pais"], "Brasil");
    assert_eq!(json["biomass_series"][1]["year"], 2016);
    assert!(json.get("tif_path").is_none());
}

#[tokio::test]
async fn test_series_outside_references_uses_sentinels() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2015]).await;
    serve_asset(&server, 2015, 90.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let store: Arc<dyn ReferenceStore> = Arc::new(InMemoryReferenceStore::new().with(
        ReferenceLayer::Country,
        "Portugal",
        rect_polygon(-9.5, 37.0, -6.2, 42.1),
    ));
    let result = pipeline(&server, store, config_with_scratch(&scratch))
        .biomass_series(&plot_dataset())
        .await
        .unwrap();

    assert_eq!(result.pais, NOT_IDENTIFIED);
    assert_eq!(result.zona_ecologica, NOT_IDENTIFIED);
    assert!(result.areas_protegidas.is_empty());
}

// ============================================================================
// Degraded output
// ============================================================================

#[tokio::test]
async fn test_strict_policy_fails_on_reference_error() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2016]).await;
    serve_asset(&server, 2016, 150.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let err = pipeline(&server, Arc::new(DownStore), config_with_scratch(&scratch))
        .generate_report(&plot_dataset())
        .await
        .unwrap_err();

    assert!(matches!(err, EcohubError::ReferenceStoreUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_reference_error_reported_before_catalog_error() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[]).await;

    let scratch = tempfile::tempdir().unwrap();
    let err = pipeline(&server, Arc::new(DownStore), config_with_scratch(&scratch))
        .biomass_series(&plot_dataset())
        .await
        .unwrap_err();

    assert!(matches!(err, EcohubError::ReferenceStoreUnavailable(_)));
}

#[tokio::test]
async fn test_allow_missing_references_degrades_to_sentinels() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[2016]).await;
    serve_asset(&server, 2016, 150.0, Duration::ZERO).await;

    let scratch = tempfile::tempdir().unwrap();
    let mut config = config_with_scratch(&scratch);
    config.degraded = DegradedPolicy::AllowMissingReferences;

    let report = pipeline(&server, Arc::new(DownStore), config)
        .generate_report(&plot_dataset())
        .await
        .unwrap();

    assert_eq!(report.result.pais, NOT_IDENTIFIED);
    assert_eq!(report.result.zona_ecologica, NOT_IDENTIFIED);
    assert_eq!(report.result.warnings.len(), 1);
    assert!(report.result.warnings[0].contains("connection refused"));
    assert_approx_eq!(report.artifact.stats().mean, 150.0, 1e-6);
}

#[tokio::test]
async fn test_allow_missing_references_still_reports_raster_errors() {
    let server = MockServer::start_async().await;
    serve_search(&server, &[]).await;

    let scratch = tempfile::tempdir().unwrap();
    let mut config = config_with_scratch(&scratch);
    config.degraded = DegradedPolicy::AllowMissingReferences;

    let err = pipeline(&server, Arc::new(DownStore), config)
        .generate_report(&plot_dataset())
        .await
        .unwrap_err();

    assert!(matches!(err, EcohubError::NoDataFound));
}
