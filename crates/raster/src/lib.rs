//! Raster Extractor
//!
//! Turns catalog items into clipped biomass rasters and per-year means.
//!
//! # Pipeline
//!
//! ```text
//! CatalogItem.asset_href
//!      │
//!      ▼
//! AssetFetcher::fetch ──► decode_geotiff (GeoKeys → CrsCode, nodata → NaN)
//!      │
//!      ▼
//! reproject_to_wgs84 (nearest neighbour, windowed to the clip bbox)
//!      │
//!      ▼
//! clip_to_polygon (pixel centre in polygon, cropped to the polygon bbox)
//!      │
//!      ├─► snapshot: write Float32 GeoTIFF ──► RasterArtifact
//!      │
//!      └─► series:   summarize ──► RasterSample { year, mean }
//! ```
//!
//! Decoding and per-pixel work run on the blocking pool; row loops are
//! parallelized with rayon.

pub mod clip;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod geotiff;
pub mod reproject;
pub mod stats;
pub mod types;

pub use clip::clip_to_polygon;
pub use error::RasterError;
pub use extractor::{
    EmptyClipPolicy, ExtractorConfig, RasterArtifact, RasterExtractor, RasterSample,
    SeriesClipGeometry, SeriesExtraction,
};
pub use fetch::{AssetFetcher, HttpAssetFetcher};
pub use geotiff::{decode_geotiff, write_geotiff, write_geotiff_file};
pub use reproject::reproject_to_wgs84;
pub use stats::{summarize, RasterStats};
pub use types::{GeoTransform, Raster};
