//! Catalog Discovery: search, per-period dedup and signing.

use std::collections::HashSet;
use std::sync::Arc;

use aoi::AreaOfInterest;
use chrono::{DateTime, Utc};
use ecohub_common::{CrsCode, EcohubError, EcohubResult, TemporalKey, TimeRange};
use futures::{pin_mut, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::client::StacClient;
use crate::model::StacItem;
use crate::search::SearchRequest;
use crate::sign::HrefSigner;

/// A raster item chosen for extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub temporal_key: TemporalKey,
    pub datetime: DateTime<Utc>,
    /// Signed, directly fetchable asset URL.
    pub asset_href: String,
    /// Raster CRS advertised by the catalog (`proj:epsg` / `proj:wkt2`).
    pub crs_hint: Option<CrsCode>,
}

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Asset holding the raster.
    pub asset_key: String,
    /// Also filter by the AOI bounding box.
    pub spatial_filter: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            asset_key: "biomass".to_string(),
            spatial_filter: true,
        }
    }
}

/// Finds the items to extract for an AOI and time range.
#[derive(Clone)]
pub struct CatalogDiscovery {
    client: StacClient,
    signer: Arc<dyn HrefSigner>,
    config: DiscoveryConfig,
}

impl CatalogDiscovery {
    pub fn new(client: StacClient, signer: Arc<dyn HrefSigner>, config: DiscoveryConfig) -> Self {
        Self {
            client,
            signer,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Items of `collection` intersecting `time_range`, at most one per
    /// temporal key (first seen wins), hrefs signed.
    ///
    /// Returns `NoDataFound` when nothing usable matches.
    #[instrument(skip(self, aoi), fields(range = %time_range))]
    pub async fn discover(
        &self,
        aoi: &AreaOfInterest,
        time_range: &TimeRange,
        collection: &str,
    ) -> EcohubResult<Vec<CatalogItem>> {
        let mut request = SearchRequest::for_collection(collection, time_range);
        if self.config.spatial_filter {
            request = request.intersecting(&aoi.bbox());
        }

        let stream = self.client.search(request);
        pin_mut!(stream);

        let mut usable: Vec<(StacItem, TemporalKey, DateTime<Utc>, String)> = Vec::new();
        let mut total = 0usize;

        while let Some(item) = stream.try_next().await? {
            total += 1;
            let Some(datetime) = item.acquisition_time() else {
                warn!(item = %item.id, "Item has no datetime; skipping");
                continue;
            };
            let Some(asset) = item.assets.get(&self.config.asset_key) else {
                warn!(item = %item.id, asset = %self.config.asset_key, "Item lacks asset; skipping");
                continue;
            };
            let href = asset.href.clone();
            usable.push((item, TemporalKey::from_datetime(&datetime), datetime, href));
        }

        let selected = dedup_first_seen(usable, |(_, key, _, _)| *key);

        if selected.is_empty() {
            info!(collection, total, "No catalog items found");
            return Err(EcohubError::NoDataFound);
        }

        let signing = self.signer.signing_for(collection).await?;
        let items: Vec<CatalogItem> = selected
            .into_iter()
            .map(|(item, temporal_key, datetime, href)| CatalogItem {
                crs_hint: crs_hint(&item),
                id: item.id,
                temporal_key,
                datetime,
                asset_href: signing.apply(&href),
            })
            .collect();

        info!(collection, total, selected = items.len(), "Discovered catalog items");
        Ok(items)
    }
}

fn crs_hint(item: &StacItem) -> Option<CrsCode> {
    if let Some(code) = item.properties.proj_epsg {
        if let Ok(crs) = CrsCode::from_epsg(code) {
            return Some(crs);
        }
    }
    item.properties
        .proj_wkt2
        .as_deref()
        .and_then(|wkt| CrsCode::from_wkt(wkt).ok())
}

/// Keep the first element for each key, preserving order.
pub fn dedup_first_seen<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}
