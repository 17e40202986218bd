//! Common types and utilities shared across all ecohub crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod reference;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{CrsCode, CrsParseError, SinusoidalParams};
pub use error::{EcohubError, EcohubResult};
pub use reference::{ReferenceLayer, SpatialMatch, NOT_IDENTIFIED};
pub use time::{TemporalKey, TimeParseError, TimeRange};
