//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Series expansions from Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), equations 8-9 through 8-25. Accuracy is well below a
//! millimetre within a zone and degrades slowly beyond ±3° of the central
//! meridian.

use crate::Projection;
use ecohub_common::CrsCode;

/// WGS84 semi-major axis (meters)
pub const WGS84_A: f64 = 6378137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257223563;

const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500000.0;
const FALSE_NORTHING_SOUTH: f64 = 10000000.0;

/// Transverse Mercator with UTM zone parameters.
#[derive(Debug, Clone, Copy)]
pub struct TransverseMercator {
    pub zone: u8,
    pub north: bool,
    /// Central meridian in degrees
    pub lon0: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    /// UTM zone 1..=60 in the given hemisphere.
    pub fn utm(zone: u8, north: bool) -> Self {
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Self {
            zone,
            north,
            lon0: zone as f64 * 6.0 - 183.0,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Zone containing a longitude (no Norway/Svalbard exceptions).
    pub fn zone_for_lon(lon: f64) -> u8 {
        let lon = ((lon + 180.0).rem_euclid(360.0)) - 180.0;
        (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8
    }

    fn false_northing(&self) -> f64 {
        if self.north {
            0.0
        } else {
            FALSE_NORTHING_SOUTH
        }
    }

    /// Meridian arc length from the equator to latitude `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

impl Projection for TransverseMercator {
    fn crs(&self) -> CrsCode {
        CrsCode::Utm {
            zone: self.zone,
            north: self.north,
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }

        let phi = lat.to_radians();
        let mut dlon = lon - self.lon0;
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        // The series diverges far from the central meridian.
        if dlon.abs() > 45.0 {
            return None;
        }

        let (sin_phi, cos_phi) = phi.sin_cos();
        let n = WGS84_A / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = phi.tan().powi(2);
        let c = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon.to_radians();
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0)
            + FALSE_EASTING;

        let y = K0
            * (m + n
                * phi.tan()
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0))
            + self.false_northing();

        Some((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = self.ep2;

        let x = x - FALSE_EASTING;
        let m = (y - self.false_northing()) / K0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1me2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        if cos_phi1.abs() < 1e-12 {
            return Some((self.lon0, phi1.to_degrees().clamp(-90.0, 90.0)));
        }

        let tan_phi1 = phi1.tan();
        let denom = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = WGS84_A / denom.sqrt();
        let t1 = tan_phi1 * tan_phi1;
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let r1 = WGS84_A * (1.0 - e2) / denom.powf(1.5);
        let d = x / (n1 * K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let dlon = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

        let lat = phi.to_degrees();
        if !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        Some((self.lon0 + dlon.to_degrees(), lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_19_central_meridian() {
        let proj = TransverseMercator::utm(19, true);
        assert_eq!(proj.lon0, -69.0);

        let (x, y) = proj.forward(-69.0, 0.0).unwrap();
        assert!((x - 500000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);
    }

    #[test]
    fn test_meridian_arc_southern_hemisphere() {
        // 10°S on the central meridian of zone 19S. Meridian arc to 10° on
        // WGS84 is 1105854.83 m; scaled by k0 and subtracted from the
        // false northing.
        let proj = TransverseMercator::utm(19, false);
        let (x, y) = proj.forward(-69.0, -10.0).unwrap();
        assert!((x - 500000.0).abs() < 1e-6);
        assert!((y - (10000000.0 - 1105854.83 * 0.9996)).abs() < 0.5, "y = {}", y);
    }

    #[test]
    fn test_roundtrip_within_zone() {
        let proj = TransverseMercator::utm(19, false);
        for (lon, lat) in [(-70.5, -12.0), (-67.2, -3.3), (-69.0, -45.0), (-71.9, -0.1)] {
            let (x, y) = proj.forward(lon, lat).unwrap();
            let (lon2, lat2) = proj.inverse(x, y).unwrap();
            assert!((lon - lon2).abs() < 1e-7, "lon {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-7, "lat {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_symmetry_about_central_meridian() {
        let proj = TransverseMercator::utm(33, true);
        let (x_east, y_east) = proj.forward(16.0, 45.0).unwrap();
        let (x_west, y_west) = proj.forward(14.0, 45.0).unwrap();
        assert!(((x_east - 500000.0) + (x_west - 500000.0)).abs() < 1e-6);
        assert!((y_east - y_west).abs() < 1e-6);
    }

    #[test]
    fn test_zone_for_lon() {
        assert_eq!(TransverseMercator::zone_for_lon(-69.0), 19);
        assert_eq!(TransverseMercator::zone_for_lon(-180.0), 1);
        assert_eq!(TransverseMercator::zone_for_lon(179.9), 60);
        assert_eq!(TransverseMercator::zone_for_lon(15.0), 33);
    }
}
