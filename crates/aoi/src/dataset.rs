//! In-memory model of an uploaded vector dataset.

use ecohub_common::CrsCode;
use geo::Geometry;

/// One record of a vector dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Identifier from the source, if it had one.
    pub id: Option<String>,
    /// `None` for null shapes / `"geometry": null`.
    pub geometry: Option<Geometry<f64>>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            id: None,
            geometry: Some(geometry),
        }
    }
}

/// A set of features sharing one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDataset {
    /// `None` when the source did not declare a CRS (e.g. shapefile without `.prj`).
    pub crs: Option<CrsCode>,
    pub features: Vec<Feature>,
}

impl VectorDataset {
    pub fn new(crs: Option<CrsCode>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
