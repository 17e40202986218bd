//! Sinusoidal equal-area projection on the MODIS sphere.
//!
//! Chloris biomass rasters are distributed on the MODIS sinusoidal grid
//! (SR-ORG:6974): a sphere of radius 6371007.181 m, central meridian 0,
//! no false easting or northing.

use crate::Projection;
use ecohub_common::crs::MODIS_SPHERE_RADIUS;
use ecohub_common::CrsCode;
use std::f64::consts::{FRAC_PI_2, PI};

#[derive(Debug, Clone, Copy)]
pub struct Sinusoidal {
    pub radius: f64,
    /// Central meridian in degrees
    pub lon0: f64,
}

impl Default for Sinusoidal {
    fn default() -> Self {
        Self::modis()
    }
}

impl Sinusoidal {
    pub fn modis() -> Self {
        Self {
            radius: MODIS_SPHERE_RADIUS,
            lon0: 0.0,
        }
    }
}

impl Projection for Sinusoidal {
    fn crs(&self) -> CrsCode {
        CrsCode::Sinusoidal
    }

    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let phi = lat.to_radians();
        let dlon = (lon - self.lon0).to_radians();
        Some((self.radius * dlon * phi.cos(), self.radius * phi))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let phi = y / self.radius;
        if phi.abs() > FRAC_PI_2 {
            return None;
        }

        let cos_phi = phi.cos();
        if cos_phi.abs() < 1e-12 {
            // At the poles every x collapses onto one point.
            return Some((self.lon0, phi.to_degrees()));
        }

        let dlon = x / (self.radius * cos_phi);
        // Points right of the ±180° edge of the sinusoid are off the map.
        if dlon.abs() > PI + 1e-12 {
            return None;
        }
        Some((dlon.to_degrees() + self.lon0, phi.to_degrees()))
    }
}
