//! Request orchestration for snapshot and series reports.

use std::path::Path;
use std::time::Instant;

use aoi::{normalize, AreaOfInterest, VectorDataset};
use ecohub_common::{EcohubError, EcohubResult, TimeRange};
use metrics::{counter, histogram};
use raster::{RasterArtifact, RasterExtractor};
use reference_store::{SpatialReferenceResolver, SpatialReferences};
use stac_catalog::{CatalogDiscovery, CatalogItem};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{DegradedPolicy, PipelineConfig};
use crate::report::{assemble, ExtractionResult, RasterOutput};

const SNAPSHOT: &str = "snapshot";
const SERIES: &str = "series";

/// A snapshot report whose GeoTIFF is still a temporary file.
///
/// Dropping it deletes the file; [`SnapshotReport::persist`] moves it into
/// durable storage and points `tif_path` at the new location.
#[derive(Debug)]
pub struct SnapshotReport {
    pub result: ExtractionResult,
    pub artifact: RasterArtifact,
}

impl SnapshotReport {
    pub fn persist(self, dir: &Path) -> EcohubResult<ExtractionResult> {
        let SnapshotReport { mut result, artifact } = self;
        let tif_path = artifact.persist(dir)?;
        result.output = RasterOutput::Snapshot { tif_path };
        Ok(result)
    }
}

/// The extraction pipeline: normalize, then resolve references and extract
/// rasters concurrently, then assemble.
#[derive(Clone)]
pub struct ExtractionPipeline {
    resolver: SpatialReferenceResolver,
    discovery: CatalogDiscovery,
    extractor: RasterExtractor,
    config: PipelineConfig,
}

impl ExtractionPipeline {
    pub fn new(
        resolver: SpatialReferenceResolver,
        discovery: CatalogDiscovery,
        extractor: RasterExtractor,
        config: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            discovery,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &SpatialReferenceResolver {
        &self.resolver
    }

    /// Snapshot mode: first item of the snapshot range, clipped with the
    /// buffered AOI and written as a GeoTIFF.
    pub async fn generate_report(&self, dataset: &VectorDataset) -> EcohubResult<SnapshotReport> {
        let request_id = Uuid::new_v4();
        let span = info_span!("generate_report", %request_id);
        let start = Instant::now();

        let result = self.snapshot(dataset).instrument(span).await;
        record(SNAPSHOT, start, result.as_ref().map(|_| ()));
        result
    }

    /// Series mode: one mean per year of the series range, clipped with the
    /// AOI and sorted by year.
    pub async fn biomass_series(&self, dataset: &VectorDataset) -> EcohubResult<ExtractionResult> {
        let request_id = Uuid::new_v4();
        let span = info_span!("biomass_series", %request_id);
        let start = Instant::now();

        let result = self.series(dataset).instrument(span).await;
        record(SERIES, start, result.as_ref().map(|_| ()));
        result
    }

    async fn snapshot(&self, dataset: &VectorDataset) -> EcohubResult<SnapshotReport> {
        let aoi = normalize(dataset)?;
        let buffered = aoi.buffered(self.config.buffer_degrees)?;
        info!(
            area_hectares = aoi.area_hectares(),
            source_crs = %aoi.source_crs(),
            "Normalized area of interest"
        );

        let raster_branch = async {
            let items = self
                .discover(&aoi, SNAPSHOT, &self.config.snapshot_range)
                .await?;
            let first = items.first().ok_or(EcohubError::NoDataFound)?;
            self.extractor.extract_snapshot(first, &buffered).await
        };

        let (references, artifact) = tokio::join!(self.resolver.resolve(&aoi), raster_branch);
        let mut warnings = Vec::new();
        let references = self.apply_degraded(references, &mut warnings)?;
        let artifact = artifact?;

        let mut result = assemble(
            references,
            RasterOutput::Snapshot {
                tif_path: artifact.path().to_path_buf(),
            },
            aoi.area_hectares(),
        );
        result.warnings = warnings;
        Ok(SnapshotReport { result, artifact })
    }

    async fn series(&self, dataset: &VectorDataset) -> EcohubResult<ExtractionResult> {
        let aoi = normalize(dataset)?;
        info!(
            area_hectares = aoi.area_hectares(),
            source_crs = %aoi.source_crs(),
            "Normalized area of interest"
        );

        let raster_branch = async {
            let items = self
                .discover(&aoi, SERIES, &self.config.series_range)
                .await?;
            self.extractor.extract_series(&items, &aoi).await
        };

        let (references, series) = tokio::join!(self.resolver.resolve(&aoi), raster_branch);
        let mut warnings = Vec::new();
        let references = self.apply_degraded(references, &mut warnings)?;
        let series = series?;

        let mut result = assemble(references, series.into(), aoi.area_hectares());
        result.warnings = warnings;
        Ok(result)
    }

    async fn discover(
        &self,
        aoi: &AreaOfInterest,
        mode: &'static str,
        range: &TimeRange,
    ) -> EcohubResult<Vec<CatalogItem>> {
        let items = self
            .discovery
            .discover(aoi, range, &self.config.collection)
            .await?;
        counter!("ecohub_catalog_items_total", "mode" => mode).increment(items.len() as u64);
        Ok(items)
    }

    /// Reference errors take precedence in strict mode; otherwise they
    /// degrade to sentinels with a warning.
    fn apply_degraded(
        &self,
        references: EcohubResult<SpatialReferences>,
        warnings: &mut Vec<String>,
    ) -> EcohubResult<Option<SpatialReferences>> {
        match (references, self.config.degraded) {
            (Ok(references), _) => Ok(Some(references)),
            (Err(e), DegradedPolicy::Strict) => Err(e),
            (Err(e), DegradedPolicy::AllowMissingReferences) => {
                warn!(error = %e, "Reference resolution failed; reporting sentinels");
                warnings.push(format!("Spatial references unavailable: {}", e));
                Ok(None)
            }
        }
    }
}

fn record(mode: &'static str, start: Instant, outcome: Result<(), &EcohubError>) {
    histogram!("ecohub_extraction_seconds", "mode" => mode).record(start.elapsed().as_secs_f64());
    match outcome {
        Ok(()) => {
            counter!("ecohub_reports_total", "mode" => mode, "outcome" => "ok").increment(1);
        }
        Err(e) => {
            let outcome = if e.is_user_visible_outcome() {
                "no_data"
            } else {
                "error"
            };
            counter!("ecohub_reports_total", "mode" => mode, "outcome" => outcome).increment(1);
            counter!("ecohub_report_errors_total", "mode" => mode, "code" => e.code()).increment(1);
        }
    }
}
