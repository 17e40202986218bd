//! Core raster types.

use ecohub_common::{BoundingBox, CrsCode};

use crate::error::RasterError;

/// Affine georeferencing for a north-up raster.
///
/// `origin_x`/`origin_y` is the outer corner of the top-left pixel;
/// both pixel sizes are positive, rows grow southwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Transform covering `bbox` with a `width` x `height` grid.
    pub fn for_bbox(bbox: &BoundingBox, width: usize, height: usize) -> Self {
        Self::new(
            bbox.min_x,
            bbox.max_y,
            bbox.width() / width as f64,
            bbox.height() / height as f64,
        )
    }

    /// World coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Fractional (col, row) of a world coordinate.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (self.origin_y - y) / self.pixel_height,
        )
    }

    /// Extent of a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        BoundingBox::new(
            self.origin_x,
            self.origin_y - height as f64 * self.pixel_height,
            self.origin_x + width as f64 * self.pixel_width,
            self.origin_y,
        )
    }

    /// Transform of the sub-grid whose top-left pixel is (col, row).
    pub fn offset(&self, col: usize, row: usize) -> Self {
        Self::new(
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y - row as f64 * self.pixel_height,
            self.pixel_width,
            self.pixel_height,
        )
    }

    pub fn is_valid(&self) -> bool {
        self.origin_x.is_finite()
            && self.origin_y.is_finite()
            && self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.pixel_width > 0.0
            && self.pixel_height > 0.0
    }
}

/// Single-band raster in row-major order (top row first).
///
/// No-data is always represented as NaN; decoders translate the file's
/// declared no-data value on read.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    pub transform: GeoTransform,
    pub crs: CrsCode,
}

impl Raster {
    pub fn new(
        width: usize,
        height: usize,
        data: Vec<f32>,
        transform: GeoTransform,
        crs: CrsCode,
    ) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Invalid(format!(
                "zero-sized raster {}x{}",
                width, height
            )));
        }
        if data.len() != width * height {
            return Err(RasterError::Invalid(format!(
                "expected {} values for {}x{}, got {}",
                width * height,
                width,
                height,
                data.len()
            )));
        }
        if !transform.is_valid() {
            return Err(RasterError::Invalid(format!(
                "degenerate transform {:?}",
                transform
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            transform,
            crs,
        })
    }

    /// Valid value at (col, row); `None` for masked pixels.
    pub fn value(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let v = self.data[row * self.width + col];
        (!v.is_nan()).then_some(v)
    }

    /// Valid value of the pixel containing world coordinate (x, y).
    pub fn sample_nearest(&self, x: f64, y: f64) -> Option<f32> {
        let (col, row) = self.transform.world_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        self.value(col.floor() as usize, row.floor() as usize)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Crop to the pixels overlapping `bbox`. `None` when nothing overlaps.
    pub fn window(&self, bbox: &BoundingBox) -> Option<Raster> {
        if !bbox.is_valid() || !self.bounds().intersects(bbox) {
            return None;
        }
        let (c0, r0) = self.transform.world_to_pixel(bbox.min_x, bbox.max_y);
        let (c1, r1) = self.transform.world_to_pixel(bbox.max_x, bbox.min_y);

        let col0 = c0.floor().max(0.0) as usize;
        let row0 = r0.floor().max(0.0) as usize;
        let col1 = c1.ceil().min(self.width as f64).max(0.0) as usize;
        let row1 = r1.ceil().min(self.height as f64).max(0.0) as usize;

        // A degenerate bbox on a pixel edge still selects that pixel.
        let col1 = if col1 == col0 && col0 < self.width {
            col0 + 1
        } else {
            col1
        };
        let row1 = if row1 == row0 && row0 < self.height {
            row0 + 1
        } else {
            row1
        };

        if col0 >= col1 || row0 >= row1 {
            return None;
        }

        let width = col1 - col0;
        let height = row1 - row0;
        let mut data = Vec::with_capacity(width * height);
        for row in row0..row1 {
            let start = row * self.width + col0;
            data.extend_from_slice(&self.data[start..start + width]);
        }

        Some(Raster {
            width,
            height,
            data,
            transform: self.transform.offset(col0, row0),
            crs: self.crs,
        })
    }
}
