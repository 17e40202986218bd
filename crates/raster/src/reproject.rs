//! Reprojection of source rasters onto a regular lon/lat grid.

use ecohub_common::{BoundingBox, CrsCode};
use projection::CrsTransform;
use rayon::prelude::*;

use crate::error::RasterError;
use crate::types::{GeoTransform, Raster};

/// Largest output edge, in pixels.
pub const MAX_OUTPUT_DIMENSION: usize = 16_384;

/// Reproject `source` to EPSG:4326 over `window` (degrees).
///
/// Nearest-neighbour: each output pixel centre is mapped into the source
/// CRS and takes the value of the source pixel containing it. The output
/// resolution matches the source pixel size measured at the window centre.
/// Pixels that fall outside the source are NaN.
///
/// Rasters already in EPSG:4326 are cropped to the window, not resampled.
pub fn reproject_to_wgs84(source: &Raster, window: &BoundingBox) -> Result<Raster, RasterError> {
    if !window.is_valid() {
        return Err(RasterError::Invalid(format!("invalid window {:?}", window)));
    }
    if source.crs.is_geographic() {
        return source.window(window).ok_or(RasterError::NoOverlap);
    }

    let to_wgs84 = CrsTransform::to_wgs84(source.crs);
    let from_wgs84 = CrsTransform::from_wgs84(source.crs);

    let (res_x, res_y) = target_resolution(source, window, &to_wgs84, &from_wgs84)?;
    let width = output_dimension(window.width(), res_x);
    let height = output_dimension(window.height(), res_y);
    if width > MAX_OUTPUT_DIMENSION || height > MAX_OUTPUT_DIMENSION {
        return Err(RasterError::TooLarge { width, height });
    }

    let transform = GeoTransform::for_bbox(window, width, height);
    let mut data = vec![f32::NAN; width * height];

    data.par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out_row)| {
            for (col, out) in out_row.iter_mut().enumerate() {
                let (lon, lat) = transform.pixel_center(col, row);
                if let Some(v) = from_wgs84
                    .try_transform(lon, lat)
                    .and_then(|(x, y)| source.sample_nearest(x, y))
                {
                    *out = v;
                }
            }
        });

    Raster::new(width, height, data, transform, CrsCode::Epsg4326)
}

/// Size in degrees of one source pixel at the window centre.
fn target_resolution(
    source: &Raster,
    window: &BoundingBox,
    to_wgs84: &CrsTransform,
    from_wgs84: &CrsTransform,
) -> Result<(f64, f64), RasterError> {
    let (lon, lat) = window.center();
    let (x, y) = from_wgs84.transform(lon, lat)?;
    let t = &source.transform;

    let (lon0, lat0) = to_wgs84.transform(x, y)?;
    let (lon1, _) = to_wgs84.transform(x + t.pixel_width, y)?;
    let (_, lat1) = to_wgs84.transform(x, y - t.pixel_height)?;

    let res_x = (lon1 - lon0).abs();
    let res_y = (lat1 - lat0).abs();
    if !(res_x > 0.0 && res_y > 0.0) || !res_x.is_finite() || !res_y.is_finite() {
        return Err(RasterError::Invalid(format!(
            "cannot derive output resolution at ({}, {})",
            lon, lat
        )));
    }
    Ok((res_x, res_y))
}

fn output_dimension(extent: f64, resolution: f64) -> usize {
    ((extent / resolution).ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mercator_raster(value: f32) -> Raster {
        // ~1 km pixels around (-69.5, -10.5) in Web Mercator.
        let transform = CrsTransform::from_wgs84(CrsCode::Epsg3857);
        let (min_x, max_y) = transform.transform(-71.0, -9.0).unwrap();
        let (max_x, min_y) = transform.transform(-68.0, -12.0).unwrap();
        let width = ((max_x - min_x) / 1000.0).ceil() as usize;
        let height = ((max_y - min_y) / 1000.0).ceil() as usize;
        Raster::new(
            width,
            height,
            vec![value; width * height],
            GeoTransform::new(min_x, max_y, 1000.0, 1000.0),
            CrsCode::Epsg3857,
        )
        .unwrap()
    }

    #[test]
    fn test_geographic_source_is_cropped() {
        let source = Raster::new(
            10,
            10,
            (0..100).map(|v| v as f32).collect(),
            GeoTransform::new(-70.0, -10.0, 0.1, 0.1),
            CrsCode::Epsg4326,
        )
        .unwrap();

        let out =
            reproject_to_wgs84(&source, &BoundingBox::new(-69.5, -10.5, -69.0, -10.0)).unwrap();
        assert_eq!((out.width, out.height), (5, 5));
        assert_eq!(out.value(0, 0), Some(5.0));
    }

    #[test]
    fn test_mercator_to_geographic() {
        let source = mercator_raster(42.0);
        let window = BoundingBox::new(-69.6, -10.6, -69.4, -10.4);
        let out = reproject_to_wgs84(&source, &window).unwrap();

        assert_eq!(out.crs, CrsCode::Epsg4326);
        // 1 km is ~0.009 degrees here, so ~22 pixels across 0.2 degrees.
        assert!(out.width > 15 && out.width < 30, "width {}", out.width);
        assert_eq!(out.valid_count(), out.width * out.height);
        assert!(out.data.iter().all(|v| *v == 42.0));

        let bounds = out.bounds();
        assert!((bounds.min_x - window.min_x).abs() < 1e-9);
        assert!((bounds.max_y - window.max_y).abs() < 1e-9);
    }

    #[test]
    fn test_window_beyond_source_is_nan() {
        let source = mercator_raster(1.0);
        let out = reproject_to_wgs84(&source, &BoundingBox::new(-60.0, -5.0, -59.9, -4.9)).unwrap();
        assert_eq!(out.valid_count(), 0);
    }

    #[test]
    fn test_geographic_window_outside_is_no_overlap() {
        let source = Raster::new(
            2,
            2,
            vec![1.0; 4],
            GeoTransform::new(-70.0, -10.0, 0.5, 0.5),
            CrsCode::Epsg4326,
        )
        .unwrap();
        assert!(matches!(
            reproject_to_wgs84(&source, &BoundingBox::new(10.0, 10.0, 11.0, 11.0)),
            Err(RasterError::NoOverlap)
        ));
    }
}
