//! Spatial reference resolution.
//!
//! Answers "which country, ecological zone and protected areas does this
//! AOI overlap?" against a [`ReferenceStore`]. Production uses PostGIS
//! ([`PostgisReferenceStore`]); tests and offline runs use
//! [`InMemoryReferenceStore`].

pub mod memory;
pub mod postgis;
pub mod resolver;
pub mod store;

pub use memory::InMemoryReferenceStore;
pub use postgis::{LayerTable, PostgisOptions, PostgisReferenceStore, ReferenceTables};
pub use resolver::{ResolverConfig, SpatialReferenceResolver, SpatialReferences};
pub use store::{ReferenceStore, TieBreakPolicy};
