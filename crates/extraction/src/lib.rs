//! Biomass report pipeline.
//!
//! ```text
//! VectorDataset ──► normalize ──► AreaOfInterest
//!                                   │
//!              ┌────────────────────┴───────────────────┐
//!              ▼                                        ▼
//!   SpatialReferenceResolver             CatalogDiscovery ──► RasterExtractor
//!              │                                        │
//!              └──────────────► assemble ◄──────────────┘
//!                                   │
//!                                   ▼
//!                            ExtractionResult
//! ```
//!
//! The two branches run concurrently for every request and always both
//! complete before the result (or the first error) is reported.

pub mod config;
pub mod pipeline;
pub mod report;

pub use config::{ConfigError, DegradedPolicy, PipelineConfig};
pub use pipeline::{ExtractionPipeline, SnapshotReport};
pub use report::{assemble, BiomassPoint, ExtractionResult, RasterOutput};
