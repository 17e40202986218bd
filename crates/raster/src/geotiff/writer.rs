//! Single-band Float32 GeoTIFF output.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use ecohub_common::crs::MODIS_SPHERE_RADIUS;
use ecohub_common::CrsCode;
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use super::*;
use crate::error::RasterError;
use crate::types::Raster;

/// Write `raster` as an uncompressed Float32 GeoTIFF.
///
/// NaN pixels are declared as no-data through `GDAL_NODATA`.
pub fn write_geotiff<W: Write + Seek>(raster: &Raster, writer: W) -> Result<(), RasterError> {
    let mut encoder = TiffEncoder::new(writer).map_err(encode_error)?;
    let mut image = encoder
        .new_image::<Gray32Float>(raster.width as u32, raster.height as u32)
        .map_err(encode_error)?;

    write_georeferencing(raster, image.encoder())?;
    image.write_data(&raster.data).map_err(encode_error)?;
    Ok(())
}

/// Write `raster` to a file path.
pub fn write_geotiff_file<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<(), RasterError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_geotiff(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_georeferencing<W: Write + Seek, K: TiffKind>(
    raster: &Raster,
    dir: &mut DirectoryEncoder<W, K>,
) -> Result<(), RasterError> {
    let t = &raster.transform;

    // ModelPixelScale: [ScaleX, ScaleY, ScaleZ]
    let pixel_scale = [t.pixel_width, t.pixel_height, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), pixel_scale.as_slice())
        .map_err(encode_error)?;

    // ModelTiepoint: raster (0, 0) at the top-left corner
    let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), tiepoint.as_slice())
        .map_err(encode_error)?;

    let (keys, ascii, doubles) = geokey_directory(raster.crs);
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), keys.as_slice())
        .map_err(encode_error)?;
    if !doubles.is_empty() {
        dir.write_tag(Tag::Unknown(GEO_DOUBLE_PARAMS_TAG), doubles.as_slice())
            .map_err(encode_error)?;
    }
    if let Some(ascii) = ascii {
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS_TAG), ascii.as_str())
            .map_err(encode_error)?;
    }

    dir.write_tag(Tag::Unknown(GDAL_NODATA_TAG), "nan")
        .map_err(encode_error)?;
    Ok(())
}

/// Key directory for `crs`, plus GeoAsciiParams and GeoDoubleParams when
/// the CRS is user-defined.
fn geokey_directory(crs: CrsCode) -> (Vec<u16>, Option<String>, Vec<f64>) {
    let mut entries: Vec<[u16; 4]> = Vec::new();
    let mut ascii = None;
    let mut doubles = Vec::new();

    match crs.epsg_code() {
        Some(code) if crs.is_geographic() => {
            entries.push([GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            entries.push([GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            entries.push([GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, code as u16]);
        }
        Some(code) => {
            entries.push([GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
            entries.push([GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            entries.push([PROJECTED_CS_TYPE_GEO_KEY, 0, 1, code as u16]);
        }
        None => {
            // User-defined sinusoidal on the MODIS sphere. Keys stay sorted by ID.
            let citation = "Sinusoidal|".to_string();
            doubles = vec![MODIS_SPHERE_RADIUS, MODIS_SPHERE_RADIUS, 0.0, 0.0, 0.0];
            entries.push([GT_MODEL_TYPE_GEO_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
            entries.push([GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
            entries.push([GEOG_SEMI_MAJOR_AXIS_GEO_KEY, GEO_DOUBLE_PARAMS_TAG, 1, 0]);
            entries.push([GEOG_SEMI_MINOR_AXIS_GEO_KEY, GEO_DOUBLE_PARAMS_TAG, 1, 1]);
            entries.push([PROJECTED_CS_TYPE_GEO_KEY, 0, 1, USER_DEFINED]);
            entries.push([
                PCS_CITATION_GEO_KEY,
                GEO_ASCII_PARAMS_TAG,
                citation.len() as u16,
                0,
            ]);
            entries.push([PROJ_COORD_TRANS_GEO_KEY, 0, 1, CT_SINUSOIDAL]);
            entries.push([PROJ_FALSE_EASTING_GEO_KEY, GEO_DOUBLE_PARAMS_TAG, 1, 2]);
            entries.push([PROJ_FALSE_NORTHING_GEO_KEY, GEO_DOUBLE_PARAMS_TAG, 1, 3]);
            entries.push([PROJ_CENTER_LONG_GEO_KEY, GEO_DOUBLE_PARAMS_TAG, 1, 4]);
            ascii = Some(citation);
        }
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    (keys, ascii, doubles)
}

fn encode_error(err: tiff::TiffError) -> RasterError {
    RasterError::Encode(err.to_string())
}
