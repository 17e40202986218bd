//! Area-of-interest (AOI) handling.
//!
//! Uploaded vector data (GeoJSON or a zipped ESRI shapefile) is read into a
//! [`VectorDataset`], then [`normalize`]d: every feature reprojected to
//! EPSG:4326 and unioned into a single [`AreaOfInterest`] multipolygon.

pub mod area;
pub mod dataset;
pub mod normalize;
pub mod readers;
pub mod wkt;

pub use area::{AreaOfInterest, BufferedAreaOfInterest, DEFAULT_BUFFER_DEGREES};
pub use dataset::{Feature, VectorDataset};
pub use normalize::normalize;
pub use readers::{read_geojson, read_upload, read_zipped_shapefile};
