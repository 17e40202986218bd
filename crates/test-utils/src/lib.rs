//! Test support shared by the ecohub crates (dev-dependency only).
//!
//! - [`generators`]: synthetic biomass grids and polygons
//! - [`shapefile`]: `.shp` and zip archives built in memory for upload tests
//! - [`fixtures`]: named extents, CRS identifiers and STAC JSON documents

pub mod fixtures;
pub mod generators;
pub mod shapefile;

pub use fixtures::*;
pub use generators::*;
pub use shapefile::*;

/// Assert two numbers differ by at most `tolerance` (compared as `f64`).
///
/// ```ignore
/// assert_approx_eq!(stats.mean, 150.0, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected, tolerance) = ($actual as f64, $expected as f64, $tolerance as f64);
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} = {} is not within {} of {}",
            stringify!($actual),
            actual,
            tolerance,
            expected
        );
    }};
}

/// [`assert_approx_eq!`] on both members of a coordinate pair.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x:expr, $y:expr), ($ex:expr, $ey:expr), $tolerance:expr) => {{
        $crate::assert_approx_eq!($x, $ex, $tolerance);
        $crate::assert_approx_eq!($y, $ey, $tolerance);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_within_tolerance() {
        assert_approx_eq!(150.0000004_f32, 150.0, 1e-6);
        assert_approx_eq!(-69.5, -69.500001, 1e-5);
        assert_coords_approx_eq!((-69.5, -10.5), (-69.5000001, -10.4999999), 1e-6);
    }

    #[test]
    #[should_panic(expected = "is not within")]
    fn test_outside_tolerance() {
        assert_approx_eq!(151.0, 150.0, 0.5);
    }
}
