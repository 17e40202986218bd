//! Snapshot and series extraction over catalog items.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aoi::{AreaOfInterest, BufferedAreaOfInterest, DEFAULT_BUFFER_DEGREES};
use bytes::Bytes;
use ecohub_common::{BoundingBox, CrsCode, EcohubError, EcohubResult, TemporalKey};
use futures::{stream, StreamExt};
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use stac_catalog::CatalogItem;
use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};

use crate::clip::clip_to_polygon;
use crate::error::RasterError;
use crate::fetch::AssetFetcher;
use crate::geotiff::{decode_geotiff, write_geotiff_file};
use crate::reproject::reproject_to_wgs84;
use crate::stats::{summarize, RasterStats};
use crate::types::Raster;

/// What a series does with an item whose clip has no valid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyClipPolicy {
    /// Leave the year out and report it in `skipped`.
    #[default]
    Skip,
    /// Fail the whole series.
    Abort,
}

/// Geometry series samples are clipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesClipGeometry {
    /// The AOI itself.
    #[default]
    Exact,
    /// The AOI grown by `buffer_degrees`, like snapshots.
    Buffered,
}

/// Extractor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Items fetched and processed at once in series mode.
    pub concurrency: usize,
    pub empty_clip: EmptyClipPolicy,
    pub series_clip: SeriesClipGeometry,
    /// Margin for [`SeriesClipGeometry::Buffered`].
    pub buffer_degrees: f64,
    /// Where snapshot artifacts are created; system temp dir when unset.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            empty_clip: EmptyClipPolicy::Skip,
            series_clip: SeriesClipGeometry::Exact,
            buffer_degrees: DEFAULT_BUFFER_DEGREES,
            artifact_dir: None,
        }
    }
}

/// Mean biomass for one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterSample {
    pub temporal_key: TemporalKey,
    pub mean_value: f64,
    pub valid_pixels: usize,
}

/// Series output: samples ascending by temporal key, plus skipped periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesExtraction {
    pub samples: Vec<RasterSample>,
    pub skipped: Vec<TemporalKey>,
}

/// A clipped GeoTIFF on disk.
///
/// The file is removed when the artifact is dropped unless it has been
/// handed over with [`RasterArtifact::persist`].
#[derive(Debug)]
pub struct RasterArtifact {
    path: TempPath,
    item_id: String,
    temporal_key: TemporalKey,
    stats: RasterStats,
}

impl RasterArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn temporal_key(&self) -> TemporalKey {
        self.temporal_key
    }

    pub fn stats(&self) -> &RasterStats {
        &self.stats
    }

    /// Move the file into `dir` and stop tracking it.
    ///
    /// A rename cannot cross filesystems, so when it fails the file is
    /// copied instead and the original removed.
    pub fn persist(self, dir: &Path) -> EcohubResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| EcohubError::Internal("Artifact path has no file name".into()))?;
        let target = dir.join(file_name);

        if let Err(err) = self.path.persist(&target) {
            debug!(
                error = %err.error,
                target = %target.display(),
                "Rename failed; copying artifact"
            );
            copy_into(&err.path, dir, &target)?;
        }
        Ok(target)
    }
}

/// Copy `source` to `target` through a staged file in `dir`, so `target`
/// never holds a partial GeoTIFF.
fn copy_into(source: &Path, dir: &Path, target: &Path) -> EcohubResult<()> {
    let mut staged = tempfile::Builder::new()
        .prefix(".biomass_")
        .tempfile_in(dir)?;
    std::io::copy(&mut File::open(source)?, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged
        .persist(target)
        .map_err(|e| EcohubError::from(e.error))?;
    Ok(())
}

/// Fetches, reprojects, clips and reduces catalog items.
#[derive(Clone)]
pub struct RasterExtractor {
    fetcher: Arc<dyn AssetFetcher>,
    config: ExtractorConfig,
}

impl RasterExtractor {
    pub fn new(fetcher: Arc<dyn AssetFetcher>, config: ExtractorConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Clip one item with the buffered AOI and write it as a GeoTIFF.
    #[instrument(skip_all, fields(item = %item.id, year = %item.temporal_key))]
    pub async fn extract_snapshot(
        &self,
        item: &CatalogItem,
        aoi: &BufferedAreaOfInterest,
    ) -> EcohubResult<RasterArtifact> {
        let bytes = self.fetcher.fetch(&item.asset_href).await?;

        let geometry = aoi.geometry().clone();
        let window = aoi.bbox();
        let crs_hint = item.crs_hint;
        let key = item.temporal_key;
        let dir = self.config.artifact_dir.clone();

        let (path, stats) = tokio::task::spawn_blocking(move || {
            let (clipped, stats) = clip_item(&bytes, crs_hint, &geometry, &window, key)?;
            let path = write_artifact(&clipped, dir.as_deref())?;
            Ok::<_, EcohubError>((path, stats))
        })
        .await
        .map_err(|e| EcohubError::Internal(format!("Snapshot task failed: {}", e)))??;

        info!(
            path = %path.display(),
            valid_pixels = stats.valid_pixels,
            mean = stats.mean,
            "Wrote snapshot artifact"
        );

        Ok(RasterArtifact {
            path,
            item_id: item.id.clone(),
            temporal_key: key,
            stats,
        })
    }

    /// Mean value per item inside the AOI, ascending by temporal key.
    ///
    /// Items are processed concurrently; completion order does not affect
    /// the output. Any error other than an empty clip fails the series.
    #[instrument(skip(self, items, aoi), fields(items = items.len()))]
    pub async fn extract_series(
        &self,
        items: &[CatalogItem],
        aoi: &AreaOfInterest,
    ) -> EcohubResult<SeriesExtraction> {
        let target = match self.config.series_clip {
            SeriesClipGeometry::Exact => ClipTarget {
                geometry: aoi.geometry().clone(),
                window: aoi.bbox(),
            },
            SeriesClipGeometry::Buffered => {
                let buffered = aoi.buffered(self.config.buffer_degrees)?;
                ClipTarget {
                    geometry: buffered.geometry().clone(),
                    window: buffered.bbox(),
                }
            }
        };
        let target = Arc::new(target);

        let samples: Vec<_> = items
            .iter()
            .map(|item| self.sample(item, Arc::clone(&target)))
            .collect();
        let mut results = stream::iter(samples).buffer_unordered(self.config.concurrency.max(1));

        let mut series = SeriesExtraction::default();
        while let Some(result) = results.next().await {
            match result {
                Ok(sample) => series.samples.push(sample),
                Err(EcohubError::EmptyClip { year })
                    if self.config.empty_clip == EmptyClipPolicy::Skip =>
                {
                    warn!(%year, "No valid pixels inside the AOI; skipping");
                    series.skipped.push(year);
                }
                Err(e) => return Err(e),
            }
        }

        series.samples.sort_by_key(|s| s.temporal_key);
        series.skipped.sort();

        info!(
            samples = series.samples.len(),
            skipped = series.skipped.len(),
            "Extracted biomass series"
        );
        Ok(series)
    }

    #[instrument(skip_all, fields(item = %item.id, year = %item.temporal_key))]
    async fn sample(
        &self,
        item: &CatalogItem,
        target: Arc<ClipTarget>,
    ) -> EcohubResult<RasterSample> {
        let bytes = self.fetcher.fetch(&item.asset_href).await?;
        let crs_hint = item.crs_hint;
        let key = item.temporal_key;

        let stats = tokio::task::spawn_blocking(move || {
            clip_item(&bytes, crs_hint, &target.geometry, &target.window, key)
                .map(|(_, stats)| stats)
        })
        .await
        .map_err(|e| EcohubError::Internal(format!("Extraction task failed: {}", e)))??;

        debug!(
            mean = stats.mean,
            valid_pixels = stats.valid_pixels,
            "Sampled item"
        );
        Ok(RasterSample {
            temporal_key: key,
            mean_value: stats.mean,
            valid_pixels: stats.valid_pixels,
        })
    }
}

/// Clip geometry with its bounding box, shared by concurrent samples.
struct ClipTarget {
    geometry: MultiPolygon<f64>,
    window: BoundingBox,
}

/// Decode, reproject over `window`, clip with `geometry` and summarize.
fn clip_item(
    bytes: &Bytes,
    crs_hint: Option<CrsCode>,
    geometry: &MultiPolygon<f64>,
    window: &BoundingBox,
    key: TemporalKey,
) -> EcohubResult<(Raster, RasterStats)> {
    let empty = |err: RasterError| match err {
        RasterError::NoOverlap => EcohubError::EmptyClip { year: key },
        other => other.into(),
    };

    let source = decode_geotiff(bytes, crs_hint)?;
    let reprojected = reproject_to_wgs84(&source, window).map_err(empty)?;
    let clipped = clip_to_polygon(&reprojected, geometry).map_err(empty)?;
    let stats = summarize(&clipped).ok_or(EcohubError::EmptyClip { year: key })?;
    Ok((clipped, stats))
}

fn write_artifact(raster: &Raster, dir: Option<&Path>) -> EcohubResult<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("biomass_").suffix(".tif");
    let file = match dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempfile_in(dir)?
        }
        None => builder.tempfile()?,
    };

    let path = file.into_temp_path();
    write_geotiff_file(raster, &path)?;
    Ok(path)
}
