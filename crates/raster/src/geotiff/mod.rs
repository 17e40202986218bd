//! GeoTIFF georeferencing: tag IDs, GeoKey directory parsing, CRS detection.

mod reader;
mod writer;

pub use reader::decode_geotiff;
pub use writer::{write_geotiff, write_geotiff_file};

use ecohub_common::{CrsCode, SinusoidalParams};

// GeoTIFF tag IDs (not in standard tiff crate)
pub(crate) const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
pub(crate) const MODEL_TIEPOINT_TAG: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION_TAG: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
pub(crate) const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;
pub(crate) const GEO_ASCII_PARAMS_TAG: u16 = 34737;
pub(crate) const GDAL_NODATA_TAG: u16 = 42113;

// GeoKey IDs
const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GT_CITATION_GEO_KEY: u16 = 1026;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const GEOG_CITATION_GEO_KEY: u16 = 2049;
pub(crate) const GEOG_SEMI_MAJOR_AXIS_GEO_KEY: u16 = 2057;
pub(crate) const GEOG_SEMI_MINOR_AXIS_GEO_KEY: u16 = 2058;
const GEOG_INV_FLATTENING_GEO_KEY: u16 = 2059;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;
const PCS_CITATION_GEO_KEY: u16 = 3073;
const PROJ_COORD_TRANS_GEO_KEY: u16 = 3075;
const PROJ_NAT_ORIGIN_LONG_GEO_KEY: u16 = 3080;
pub(crate) const PROJ_FALSE_EASTING_GEO_KEY: u16 = 3082;
pub(crate) const PROJ_FALSE_NORTHING_GEO_KEY: u16 = 3083;
pub(crate) const PROJ_CENTER_LONG_GEO_KEY: u16 = 3088;

// GeoKey values
pub(crate) const MODEL_TYPE_PROJECTED: u16 = 1;
pub(crate) const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub(crate) const RASTER_PIXEL_IS_AREA: u16 = 1;
pub(crate) const RASTER_PIXEL_IS_POINT: u16 = 2;
pub(crate) const USER_DEFINED: u16 = 32767;
pub(crate) const CT_SINUSOIDAL: u16 = 24;

/// The GeoKeys the extractor cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    pub model_type: Option<u16>,
    pub raster_type: Option<u16>,
    pub geographic_type: Option<u16>,
    pub projected_type: Option<u16>,
    pub coord_transform: Option<u16>,
    pub citations: Vec<String>,
    /// Ellipsoid and projection parameters from GeoDoubleParams.
    pub sinusoidal: SinusoidalParams,
}

impl GeoKeys {
    /// Parse a GeoKeyDirectory, resolving ASCII values from GeoAsciiParams
    /// and doubles from GeoDoubleParams.
    ///
    /// Layout: `[version, revision, minor, count]` then `count` entries of
    /// `[key, tiff_tag_location, count, value_or_offset]`.
    pub fn parse(
        directory: &[u16],
        ascii_params: Option<&str>,
        double_params: Option<&[f64]>,
    ) -> Self {
        let mut keys = GeoKeys::default();
        if directory.len() < 4 {
            return keys;
        }

        let declared = directory[3] as usize;
        for entry in directory[4..].chunks_exact(4).take(declared) {
            let (key, location, count, value) = (entry[0], entry[1], entry[2], entry[3]);

            if location == GEO_ASCII_PARAMS_TAG {
                if let Some(text) = ascii_params.and_then(|a| ascii_value(a, value, count)) {
                    if matches!(
                        key,
                        GT_CITATION_GEO_KEY | GEOG_CITATION_GEO_KEY | PCS_CITATION_GEO_KEY
                    ) {
                        keys.citations.push(text);
                    }
                }
                continue;
            }
            if location == GEO_DOUBLE_PARAMS_TAG {
                let value = double_params.and_then(|d| d.get(value as usize)).copied();
                let params = &mut keys.sinusoidal;
                match key {
                    GEOG_SEMI_MAJOR_AXIS_GEO_KEY => params.semi_major = value,
                    GEOG_SEMI_MINOR_AXIS_GEO_KEY => params.semi_minor = value,
                    GEOG_INV_FLATTENING_GEO_KEY => params.inverse_flattening = value,
                    PROJ_NAT_ORIGIN_LONG_GEO_KEY | PROJ_CENTER_LONG_GEO_KEY => {
                        params.central_meridian = value
                    }
                    PROJ_FALSE_EASTING_GEO_KEY => params.false_easting = value,
                    PROJ_FALSE_NORTHING_GEO_KEY => params.false_northing = value,
                    _ => {}
                }
                continue;
            }
            if location != 0 {
                continue;
            }

            match key {
                GT_MODEL_TYPE_GEO_KEY => keys.model_type = Some(value),
                GT_RASTER_TYPE_GEO_KEY => keys.raster_type = Some(value),
                GEOGRAPHIC_TYPE_GEO_KEY => keys.geographic_type = Some(value),
                PROJECTED_CS_TYPE_GEO_KEY => keys.projected_type = Some(value),
                PROJ_COORD_TRANS_GEO_KEY => keys.coord_transform = Some(value),
                _ => {}
            }
        }
        keys
    }

    /// CRS named by these keys, if it is one the pipeline supports.
    pub fn crs(&self) -> Option<CrsCode> {
        if let Some(code) = self.projected_type.filter(|c| *c != USER_DEFINED) {
            return CrsCode::from_epsg(code as u32).ok();
        }

        if self.is_user_defined_sinusoidal() {
            return self.sinusoidal.is_modis().then_some(CrsCode::Sinusoidal);
        }

        if let Some(crs) = self
            .citations
            .iter()
            .find_map(|c| CrsCode::from_wkt(c).ok())
            .filter(|crs| *crs != CrsCode::Sinusoidal || self.sinusoidal.is_modis())
        {
            return Some(crs);
        }

        if self.model_type == Some(MODEL_TYPE_GEOGRAPHIC)
            && self.geographic_type.map_or(true, |code| {
                CrsCode::from_epsg(code as u32).map_or(false, |crs| crs.is_geographic())
            })
        {
            return Some(CrsCode::Epsg4326);
        }

        None
    }

    /// A user-defined sinusoidal CRS; only the MODIS grid is supported.
    pub fn is_user_defined_sinusoidal(&self) -> bool {
        self.projected_type == Some(USER_DEFINED) && self.coord_transform == Some(CT_SINUSOIDAL)
    }

    pub fn pixel_is_point(&self) -> bool {
        self.raster_type == Some(RASTER_PIXEL_IS_POINT)
    }
}

fn ascii_value(ascii: &str, offset: u16, count: u16) -> Option<String> {
    let start = offset as usize;
    let end = start + count as usize;
    let text = ascii.get(start..end.min(ascii.len()))?;
    let text = text.trim_end_matches(['|', '\0']).trim();
    (!text.is_empty()).then(|| text.to_string())
}
