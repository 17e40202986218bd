//! Service configuration.
//!
//! Connection strings and paths come from the environment (or `.env`);
//! pipeline tuning comes from an optional YAML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use extraction::PipelineConfig;
use stac_catalog::{PLANETARY_COMPUTER_SAS_URL, PLANETARY_COMPUTER_STAC_URL};

/// Default upload limit (zipped shapefiles of large properties can be big).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub stac_api_url: String,
    /// SAS token endpoint; `None` leaves asset hrefs unsigned.
    pub stac_sas_url: Option<String>,
    /// Where snapshot GeoTIFFs are kept after a report.
    pub artifact_dir: PathBuf,
    pub http_timeout: Duration,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl ServiceConfig {
    /// The Planetary Computer needs signed hrefs; other catalogs only when
    /// a SAS endpoint is configured explicitly.
    pub fn resolve_sas_url(stac_api_url: &str, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| {
            (stac_api_url.trim_end_matches('/') == PLANETARY_COMPUTER_STAC_URL)
                .then(|| PLANETARY_COMPUTER_SAS_URL.to_string())
        })
    }
}

/// Load the pipeline YAML, or defaults when no path is given.
pub fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        tracing::info!("No pipeline config given, using defaults");
        return Ok(PipelineConfig::default());
    };

    let config = PipelineConfig::load(path)
        .with_context(|| format!("Failed to load pipeline config {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        collection = %config.collection,
        "Loaded pipeline config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sas_url_defaults_for_planetary_computer() {
        assert_eq!(
            ServiceConfig::resolve_sas_url(PLANETARY_COMPUTER_STAC_URL, None).as_deref(),
            Some(PLANETARY_COMPUTER_SAS_URL)
        );
        assert_eq!(
            ServiceConfig::resolve_sas_url("https://stac.example.org/v1", None),
            None
        );
        assert_eq!(
            ServiceConfig::resolve_sas_url(
                "https://stac.example.org/v1",
                Some("https://sas.example.org".into())
            )
            .as_deref(),
            Some("https://sas.example.org")
        );
    }

    #[test]
    fn test_load_pipeline_config() {
        assert_eq!(load_pipeline_config(None).unwrap(), PipelineConfig::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "extractor:\n  concurrency: 2").unwrap();
        let config = load_pipeline_config(Some(file.path())).unwrap();
        assert_eq!(config.extractor.concurrency, 2);

        let err = load_pipeline_config(Some(Path::new("/nonexistent/pipeline.yaml"))).unwrap_err();
        assert!(err.to_string().contains("pipeline.yaml"));
    }
}
