//! Web Mercator (EPSG:3857) spherical projection.

use crate::Projection;
use ecohub_common::CrsCode;
use std::f64::consts::PI;

/// Radius of the sphere used by Web Mercator (WGS84 semi-major axis).
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude limit where the Web Mercator square ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn crs(&self) -> CrsCode {
        CrsCode::Epsg3857
    }

    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        Some((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        Some((lon, lat))
    }
}
