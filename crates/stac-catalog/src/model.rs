//! The subset of the STAC item model the pipeline reads.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A STAC Item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    pub properties: ItemProperties,
    #[serde(default)]
    pub assets: HashMap<String, Asset>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl StacItem {
    /// Acquisition time: `datetime`, or `start_datetime` when the item
    /// describes a range with a null `datetime`.
    pub fn acquisition_time(&self) -> Option<DateTime<Utc>> {
        self.properties.datetime.or(self.properties.start_datetime)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemProperties {
    #[serde(default)]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub start_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_datetime: Option<DateTime<Utc>>,
    #[serde(rename = "proj:epsg", default, skip_serializing_if = "Option::is_none")]
    pub proj_epsg: Option<u32>,
    #[serde(rename = "proj:wkt2", default, skip_serializing_if = "Option::is_none")]
    pub proj_wkt2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub href: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// A link object; `next` links may carry a method and a body to re-POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub merge: bool,
}

impl Link {
    pub fn is_post(&self) -> bool {
        self.method
            .as_deref()
            .map(|m| m.eq_ignore_ascii_case("POST"))
            .unwrap_or(false)
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCollection {
    #[serde(default)]
    pub features: Vec<StacItem>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl ItemCollection {
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_with_range_datetime() {
        let json = serde_json::json!({
            "id": "chloris_biomass_2016",
            "collection": "chloris-biomass",
            "properties": {
                "datetime": null,
                "start_datetime": "2016-01-01T00:00:00Z",
                "end_datetime": "2016-12-31T23:59:59Z",
                "proj:epsg": null,
                "proj:wkt2": "PROJCRS[\"unnamed\",CONVERSION[\"unnamed\",METHOD[\"Sinusoidal\"]]]"
            },
            "assets": {"biomass": {"href": "https://example.blob.core.windows.net/a.tif"}}
        });
        let item: StacItem = serde_json::from_value(json).unwrap();
        assert_eq!(
            item.acquisition_time().unwrap().to_rfc3339(),
            "2016-01-01T00:00:00+00:00"
        );
        assert!(item.properties.proj_epsg.is_none());
        assert!(item.assets.contains_key("biomass"));
    }

    #[test]
    fn test_next_link() {
        let json = serde_json::json!({
            "features": [],
            "links": [
                {"rel": "self", "href": "http://x/search"},
                {"rel": "next", "href": "http://x/search", "method": "POST", "body": {"token": "abc"}, "merge": true}
            ]
        });
        let page: ItemCollection = serde_json::from_value(json).unwrap();
        let next = page.next_link().unwrap();
        assert!(next.is_post());
        assert!(next.merge);
    }
}
