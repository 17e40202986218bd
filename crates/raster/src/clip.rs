//! Polygon masking of lon/lat rasters.

use ecohub_common::BoundingBox;
use geo::{BoundingRect, Coord, Intersects, MultiPolygon};
use rayon::prelude::*;

use crate::error::RasterError;
use crate::types::Raster;

/// Crop `raster` to the bounding box of `geometry` and mask every pixel
/// whose centre is not inside (or on the boundary of) the geometry.
///
/// Both must be in the same CRS. Returns [`RasterError::NoOverlap`] when the
/// geometry's bounding box misses the raster entirely.
pub fn clip_to_polygon(
    raster: &Raster,
    geometry: &MultiPolygon<f64>,
) -> Result<Raster, RasterError> {
    let rect = geometry.bounding_rect().ok_or(RasterError::NoOverlap)?;
    let bbox = BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
    let mut clipped = raster.window(&bbox).ok_or(RasterError::NoOverlap)?;

    let width = clipped.width;
    let transform = clipped.transform;

    clipped
        .data
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, values)| {
            for (col, v) in values.iter_mut().enumerate() {
                if v.is_nan() {
                    continue;
                }
                let (x, y) = transform.pixel_center(col, row);
                if !geometry.intersects(&Coord { x, y }) {
                    *v = f32::NAN;
                }
            }
        });

    Ok(clipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use ecohub_common::CrsCode;
    use geo::polygon;

    fn ones(width: usize, height: usize) -> Raster {
        Raster::new(
            width,
            height,
            vec![1.0; width * height],
            GeoTransform::new(0.0, 10.0, 1.0, 1.0),
            CrsCode::Epsg4326,
        )
        .unwrap()
    }

    #[test]
    fn test_clip_masks_outside_pixel_centres() {
        // Hypotenuse x + y = 9.9 keeps pixel centres off the boundary.
        let triangle = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 6.0),
            (x: 3.9, y: 6.0),
            (x: 0.0, y: 9.9),
        ]]);
        let clipped = clip_to_polygon(&ones(10, 10), &triangle).unwrap();

        assert_eq!((clipped.width, clipped.height), (4, 4));
        // Row 3 (y centre 6.5): centres at x 0.5..2.5 are inside.
        assert_eq!(clipped.value(0, 3), Some(1.0));
        assert_eq!(clipped.value(2, 3), Some(1.0));
        assert_eq!(clipped.value(3, 3), None);
        // Row 0 (y centre 9.5): nothing is below the hypotenuse.
        assert_eq!(clipped.value(0, 0), None);
        assert_eq!(clipped.valid_count(), 6);
    }

    #[test]
    fn test_clip_respects_holes() {
        let with_hole = MultiPolygon::new(vec![polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 5.0, y: 0.0),
                (x: 5.0, y: 5.0),
                (x: 0.0, y: 5.0),
            ],
            interiors: [
                [
                    (x: 2.0, y: 2.0),
                    (x: 3.0, y: 2.0),
                    (x: 3.0, y: 3.0),
                    (x: 2.0, y: 3.0),
                ],
            ],
        )]);
        let clipped = clip_to_polygon(&ones(10, 10), &with_hole).unwrap();
        assert_eq!(clipped.valid_count(), 24);
    }

    #[test]
    fn test_clip_outside_raster() {
        let far = MultiPolygon::new(vec![polygon![
            (x: 50.0, y: 50.0),
            (x: 51.0, y: 50.0),
            (x: 51.0, y: 51.0),
        ]]);
        assert!(matches!(
            clip_to_polygon(&ones(4, 4), &far),
            Err(RasterError::NoOverlap)
        ));
    }
}
