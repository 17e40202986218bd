//! Application state for the report API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use extraction::ExtractionPipeline;
use metrics_exporter_prometheus::PrometheusHandle;
use raster::{HttpAssetFetcher, RasterExtractor};
use reference_store::{PostgisOptions, PostgisReferenceStore, SpatialReferenceResolver};
use stac_catalog::{
    CatalogDiscovery, HrefSigner, NoopSigner, PlanetaryComputerSigner, StacClient,
    StacClientConfig,
};

use crate::config::ServiceConfig;

/// Shared application state.
pub struct AppState {
    pub pipeline: ExtractionPipeline,

    /// Where snapshot GeoTIFFs are persisted.
    pub artifact_dir: PathBuf,

    /// Renders the Prometheus exposition for `/metrics`.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Wire the pipeline to PostGIS and the STAC API.
    ///
    /// The database pool connects lazily so the service can start (and
    /// report not-ready) while the database is down.
    pub fn new(config: &ServiceConfig, metrics: PrometheusHandle) -> Result<Self> {
        let mut pipeline_config = config.pipeline.clone();
        // Create artifacts next to where they are persisted so persisting
        // is a rename.
        pipeline_config
            .extractor
            .artifact_dir
            .get_or_insert_with(|| config.artifact_dir.clone());

        let store = PostgisReferenceStore::connect_lazy(
            &config.database_url,
            pipeline_config.tables.clone(),
            PostgisOptions::default(),
        )
        .context("Invalid reference store configuration")?;
        let resolver = SpatialReferenceResolver::new(Arc::new(store), pipeline_config.resolver);

        let client = StacClient::new(StacClientConfig {
            base_url: config.stac_api_url.clone(),
            request_timeout: config.http_timeout,
            ..StacClientConfig::default()
        })
        .context("Failed to build STAC client")?;
        let signer: Arc<dyn HrefSigner> = match &config.stac_sas_url {
            Some(sas_url) => Arc::new(PlanetaryComputerSigner::new(
                client.http().clone(),
                sas_url.clone(),
            )),
            None => Arc::new(NoopSigner),
        };
        let discovery = CatalogDiscovery::new(client, signer, pipeline_config.discovery.clone());

        let fetcher = HttpAssetFetcher::new(config.http_timeout)
            .context("Failed to build asset fetcher")?;
        let extractor = RasterExtractor::new(Arc::new(fetcher), pipeline_config.extractor.clone());

        std::fs::create_dir_all(&config.artifact_dir).with_context(|| {
            format!(
                "Failed to create artifact directory {}",
                config.artifact_dir.display()
            )
        })?;

        tracing::info!(
            stac_api_url = %config.stac_api_url,
            signed = config.stac_sas_url.is_some(),
            artifact_dir = %config.artifact_dir.display(),
            "Initialized extraction pipeline"
        );

        Ok(Self {
            pipeline: ExtractionPipeline::new(resolver, discovery, extractor, pipeline_config),
            artifact_dir: config.artifact_dir.clone(),
            metrics,
        })
    }
}
