//! GeoTIFF decoding into a NaN-masked [`Raster`].

use std::io::Cursor;

use ecohub_common::CrsCode;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use super::{
    GeoKeys, GDAL_NODATA_TAG, GEO_ASCII_PARAMS_TAG, GEO_DOUBLE_PARAMS_TAG, GEO_KEY_DIRECTORY_TAG,
    MODEL_PIXEL_SCALE_TAG, MODEL_TIEPOINT_TAG, MODEL_TRANSFORMATION_TAG,
};
use crate::error::RasterError;
use crate::types::{GeoTransform, Raster};

type TiffReader<'a> = Decoder<Cursor<&'a [u8]>>;

/// Decode a single-band GeoTIFF.
///
/// The CRS comes from the GeoKeys; `crs_hint` (typically the catalog's
/// `proj:epsg`/`proj:wkt2`) is used only when the keys do not name a
/// supported CRS. A user-defined sinusoidal grid that is not the MODIS one
/// is rejected outright. Pixels equal to `GDAL_NODATA` become NaN.
pub fn decode_geotiff(bytes: &[u8], crs_hint: Option<CrsCode>) -> Result<Raster, RasterError> {
    let mut decoder = Decoder::new(Cursor::new(bytes))?.with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions()?;
    match decoder.colortype()? {
        ColorType::Gray(_) => {}
        other => {
            return Err(RasterError::UnsupportedLayout(format!(
                "expected a single band, found {:?}",
                other
            )))
        }
    }

    let ascii_params = optional_string(&mut decoder, GEO_ASCII_PARAMS_TAG)?;
    let double_params = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_DOUBLE_PARAMS_TAG))? {
        Some(value) => Some(value.into_f64_vec()?),
        None => None,
    };
    let geokeys = match decoder.find_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY_TAG))? {
        Some(value) => GeoKeys::parse(
            &value.into_u16_vec()?,
            ascii_params.as_deref(),
            double_params.as_deref(),
        ),
        None => GeoKeys::default(),
    };
    if geokeys.is_user_defined_sinusoidal() && !geokeys.sinusoidal.is_modis() {
        return Err(RasterError::UnsupportedCrs(format!(
            "sinusoidal grid other than MODIS: {:?}",
            geokeys.sinusoidal
        )));
    }

    let mut transform = read_transform(&mut decoder)?;
    if geokeys.pixel_is_point() {
        transform.origin_x -= transform.pixel_width / 2.0;
        transform.origin_y += transform.pixel_height / 2.0;
    }

    let crs = geokeys.crs().or(crs_hint).ok_or(RasterError::UnknownCrs)?;

    let nodata = optional_string(&mut decoder, GDAL_NODATA_TAG)?
        .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok());

    let mut data = to_f32(decoder.read_image()?);
    if let Some(nodata) = nodata.filter(|v| !v.is_nan()) {
        let nodata = nodata as f32;
        for v in data.iter_mut() {
            if *v == nodata {
                *v = f32::NAN;
            }
        }
    }
    for v in data.iter_mut() {
        if v.is_infinite() {
            *v = f32::NAN;
        }
    }

    debug!(
        width,
        height,
        crs = %crs,
        nodata = ?nodata,
        "Decoded GeoTIFF"
    );

    Raster::new(width as usize, height as usize, data, transform, crs)
}

fn read_transform(decoder: &mut TiffReader<'_>) -> Result<GeoTransform, RasterError> {
    let scale = decoder.find_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG))?;
    let tiepoint = decoder.find_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG))?;

    let transform = if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        let scale = scale.into_f64_vec()?;
        let tie = tiepoint.into_f64_vec()?;
        if scale.len() < 2 || tie.len() < 6 {
            return Err(RasterError::MissingGeoreference(
                "truncated ModelPixelScale/ModelTiepoint".into(),
            ));
        }
        // Tiepoint [I, J, K, X, Y, Z] ties raster (I, J) to model (X, Y).
        GeoTransform::new(
            tie[3] - tie[0] * scale[0],
            tie[4] + tie[1] * scale[1],
            scale[0],
            scale[1],
        )
    } else if let Some(matrix) =
        decoder.find_tag(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION_TAG))?
    {
        let m = matrix.into_f64_vec()?;
        if m.len() < 16 {
            return Err(RasterError::MissingGeoreference(
                "truncated ModelTransformation".into(),
            ));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(RasterError::UnsupportedLayout("rotated raster".into()));
        }
        GeoTransform::new(m[3], m[7], m[0], -m[5])
    } else {
        return Err(RasterError::MissingGeoreference(
            "no tiepoint, scale or transformation tags".into(),
        ));
    };

    if !transform.is_valid() {
        return Err(RasterError::UnsupportedLayout(format!(
            "non north-up transform {:?}",
            transform
        )));
    }
    Ok(transform)
}

fn optional_string(decoder: &mut TiffReader<'_>, tag: u16) -> Result<Option<String>, RasterError> {
    match decoder.find_tag(Tag::from_u16_exhaustive(tag))? {
        Some(value) => Ok(Some(value.into_string()?)),
        None => Ok(None),
    }
}

fn to_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
    }
}
