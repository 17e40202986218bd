//! STAC catalog discovery.
//!
//! Searches a STAC API for raster items of one collection over a time range
//! (and optionally the AOI footprint), keeps the first item per temporal key
//! and signs asset hrefs so they can be fetched.

pub mod client;
pub mod discovery;
pub mod model;
pub mod search;
pub mod sign;

pub use client::{StacClient, StacClientConfig};
pub use discovery::{dedup_first_seen, CatalogDiscovery, CatalogItem, DiscoveryConfig};
pub use model::{Asset, ItemCollection, ItemProperties, Link, StacItem};
pub use search::{cql2_filter, SearchRequest};
pub use sign::{HrefSigner, HrefSigning, NoopSigner, PlanetaryComputerSigner};

/// The public Microsoft Planetary Computer STAC API.
pub const PLANETARY_COMPUTER_STAC_URL: &str = "https://planetarycomputer.microsoft.com/api/stac/v1";

/// Planetary Computer SAS token service.
pub const PLANETARY_COMPUTER_SAS_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1";
