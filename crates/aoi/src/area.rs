//! The normalized area of interest and its buffered derivative.

use crate::wkt::multipolygon_to_wkt;
use ecohub_common::{BoundingBox, CrsCode, EcohubError, EcohubResult};
use geo::{BoundingRect, Buffer, GeodesicArea, MultiPolygon};

/// Buffer margin in degrees applied around the AOI for snapshot clipping.
pub const DEFAULT_BUFFER_DEGREES: f64 = 0.09;

/// A non-empty multipolygon in EPSG:4326.
///
/// Built once per request by [`crate::normalize`] and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    geometry: MultiPolygon<f64>,
    source_crs: CrsCode,
}

impl AreaOfInterest {
    /// Wrap an EPSG:4326 multipolygon. Rejects empty geometry.
    pub fn new(geometry: MultiPolygon<f64>, source_crs: CrsCode) -> EcohubResult<Self> {
        if geometry.0.is_empty() || geometry.0.iter().all(|p| p.exterior().0.is_empty()) {
            return Err(EcohubError::InvalidInput("Area of interest is empty".into()));
        }
        Ok(Self {
            geometry,
            source_crs,
        })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// CRS the upload was declared in before normalization.
    pub fn source_crs(&self) -> CrsCode {
        self.source_crs
    }

    /// Geodesic area on the WGS84 ellipsoid, in hectares.
    pub fn area_hectares(&self) -> f64 {
        self.geometry.geodesic_area_unsigned() / 10_000.0
    }

    /// Bounding box in degrees.
    pub fn bbox(&self) -> BoundingBox {
        bbox_of(&self.geometry)
    }

    /// WKT text for spatial SQL.
    pub fn to_wkt(&self) -> String {
        multipolygon_to_wkt(&self.geometry)
    }

    /// Buffer by `margin` degrees on every side.
    pub fn buffered(&self, margin: f64) -> EcohubResult<BufferedAreaOfInterest> {
        if !margin.is_finite() || margin < 0.0 {
            return Err(EcohubError::InvalidInput(format!(
                "Buffer margin must be a non-negative number of degrees, got {}",
                margin
            )));
        }
        let geometry = if margin == 0.0 {
            self.geometry.clone()
        } else {
            self.geometry.buffer(margin)
        };
        Ok(BufferedAreaOfInterest { geometry })
    }
}

/// The AOI grown by a fixed margin in degrees. Used as the snapshot clip
/// geometry so the delivered raster carries some context around the AOI.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedAreaOfInterest {
    geometry: MultiPolygon<f64>,
}

impl BufferedAreaOfInterest {
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bbox(&self) -> BoundingBox {
        bbox_of(&self.geometry)
    }
}

fn bbox_of(geometry: &MultiPolygon<f64>) -> BoundingBox {
    match geometry.bounding_rect() {
        Some(rect) => BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y),
        None => BoundingBox::new(0.0, 0.0, 0.0, 0.0),
    }
}
