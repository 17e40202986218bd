//! Axis-aligned extents.

use serde::{Deserialize, Serialize};

/// Extent in the units of whatever CRS the caller is working in: degrees
/// for AOIs and catalog filters, metres for projected raster grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.min_x + self.width() / 2.0,
            self.min_y + self.height() / 2.0,
        )
    }

    /// Closed-interval overlap; boxes sharing only an edge intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(other.min_x > self.max_x
            || other.max_x < self.min_x
            || other.min_y > self.max_y
            || other.max_y < self.min_y)
    }

    /// Finite corners with `min <= max` on both axes.
    pub fn is_valid(&self) -> bool {
        let corners = [self.min_x, self.min_y, self.max_x, self.max_y];
        corners.iter().all(|v| v.is_finite()) && self.width() >= 0.0 && self.height() >= 0.0
    }

    /// Exterior ring, counter-clockwise and closed.
    pub fn ring(&self) -> [(f64, f64); 5] {
        [
            (self.min_x, self.min_y),
            (self.max_x, self.min_y),
            (self.max_x, self.max_y),
            (self.min_x, self.max_y),
            (self.min_x, self.min_y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_of_acre_tiles() {
        let west = BoundingBox::new(-71.0, -11.0, -70.0, -10.0);
        let plot = BoundingBox::new(-70.2, -10.6, -69.8, -10.4);
        let ocean = BoundingBox::new(-20.0, -30.0, -19.0, -29.0);

        assert!(west.intersects(&plot));
        assert!(plot.intersects(&west));
        assert!(!west.intersects(&ocean));
    }
}
