//! Point transformation between supported CRSs.

use crate::{
    error::ProjectionError, Geographic, Projection, Sinusoidal, TransverseMercator, WebMercator,
};
use ecohub_common::CrsCode;

/// Build the projection for a CRS.
pub fn projection_for(crs: CrsCode) -> Box<dyn Projection> {
    match crs {
        CrsCode::Epsg4326 => Box::new(Geographic),
        CrsCode::Epsg3857 => Box::new(WebMercator),
        CrsCode::Utm { zone, north } => Box::new(TransverseMercator::utm(zone, north)),
        CrsCode::Sinusoidal => Box::new(Sinusoidal::modis()),
    }
}

/// A reusable transformation from one CRS to another, pivoting through
/// WGS84 lon/lat.
///
/// Build once and call [`CrsTransform::transform`] per coordinate; inner
/// loops (per-vertex, per-pixel) should not rebuild projections.
pub struct CrsTransform {
    source: Box<dyn Projection>,
    target: Box<dyn Projection>,
    identity: bool,
}

impl CrsTransform {
    pub fn new(source: CrsCode, target: CrsCode) -> Self {
        Self {
            source: projection_for(source),
            target: projection_for(target),
            identity: source == target,
        }
    }

    /// Transform from `source` into EPSG:4326.
    pub fn to_wgs84(source: CrsCode) -> Self {
        Self::new(source, CrsCode::Epsg4326)
    }

    /// Transform from EPSG:4326 into `target`.
    pub fn from_wgs84(target: CrsCode) -> Self {
        Self::new(CrsCode::Epsg4326, target)
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Transform one coordinate, or `None` if it falls outside either domain.
    pub fn try_transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.identity {
            return (x.is_finite() && y.is_finite()).then_some((x, y));
        }
        let (lon, lat) = self.source.inverse(x, y)?;
        let (tx, ty) = self.target.forward(lon, lat)?;
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }

    /// Transform one coordinate, reporting why it failed.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ProjectionError::NonFinite { x, y });
        }
        self.try_transform(x, y)
            .ok_or(ProjectionError::OutOfDomain {
                crs: self.source.crs(),
                x,
                y,
            })
    }
}

impl std::fmt::Debug for CrsTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsTransform")
            .field("source", &self.source.crs())
            .field("target", &self.target.crs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passthrough() {
        let t = CrsTransform::new(CrsCode::Epsg4326, CrsCode::Epsg4326);
        assert!(t.is_identity());
        assert_eq!(t.transform(-69.5, -10.25).unwrap(), (-69.5, -10.25));
        assert!(t.transform(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_utm_to_mercator_via_wgs84() {
        let utm = CrsCode::Utm {
            zone: 19,
            north: false,
        };
        let to_merc = CrsTransform::new(utm, CrsCode::Epsg3857);
        let to_geo = CrsTransform::to_wgs84(utm);

        let (x, y) = (450000.0, 8800000.0);
        let (mx, my) = to_merc.transform(x, y).unwrap();
        let (lon, lat) = to_geo.transform(x, y).unwrap();
        let (mx2, my2) = WebMercator.forward(lon, lat).unwrap();
        assert!((mx - mx2).abs() < 1e-6);
        assert!((my - my2).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_domain_reported() {
        let t = CrsTransform::to_wgs84(CrsCode::Sinusoidal);
        let err = t.transform(3.0e7, 0.0).unwrap_err();
        assert!(matches!(err, ProjectionError::OutOfDomain { .. }));
    }
}
