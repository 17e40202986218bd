//! Readers for uploaded vector data.

mod geojson;
mod shapefile;

pub use self::geojson::read_geojson;
pub use self::shapefile::read_zipped_shapefile;

use crate::VectorDataset;
use ecohub_common::EcohubResult;

const ZIP_SIGNATURE: &[u8] = b"PK\x03\x04";

/// Read an upload, dispatching on content: zip archives are treated as
/// zipped shapefiles, anything else as GeoJSON.
pub fn read_upload(bytes: &[u8]) -> EcohubResult<VectorDataset> {
    if bytes.starts_with(ZIP_SIGNATURE) {
        read_zipped_shapefile(bytes)
    } else {
        read_geojson(bytes)
    }
}
