//! Reference layer identifiers and intersection matches.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Label reported when a single-match layer has no intersecting feature.
pub const NOT_IDENTIFIED: &str = "Não identificado";

/// The reference layers an AOI is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceLayer {
    Country,
    EcologicalZone,
    ProtectedArea,
}

impl ReferenceLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceLayer::Country => "country",
            ReferenceLayer::EcologicalZone => "ecological_zone",
            ReferenceLayer::ProtectedArea => "protected_area",
        }
    }
}

impl fmt::Display for ReferenceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feature of a reference layer that intersects the AOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialMatch {
    pub layer: ReferenceLayer,
    pub label: String,
}

impl SpatialMatch {
    pub fn new(layer: ReferenceLayer, label: impl Into<String>) -> Self {
        Self {
            layer,
            label: label.into(),
        }
    }
}
