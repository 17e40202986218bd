//! STAC `/search` request bodies and CQL2 filters.

use ecohub_common::{BoundingBox, TimeRange};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body of a `POST /search` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersects: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(rename = "filter-lang", skip_serializing_if = "Option::is_none")]
    pub filter_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SearchRequest {
    /// Items of `collection` whose datetime interacts with `time_range`.
    pub fn for_collection(collection: &str, time_range: &TimeRange) -> Self {
        Self {
            filter: Some(cql2_filter(time_range, collection)),
            filter_lang: Some("cql2-json".to_string()),
            ..Self::default()
        }
    }

    /// Restrict to items whose footprint intersects `bbox`.
    pub fn intersecting(mut self, bbox: &BoundingBox) -> Self {
        let ring: Vec<[f64; 2]> = bbox.ring().iter().map(|&(x, y)| [x, y]).collect();
        self.intersects = Some(json!({"type": "Polygon", "coordinates": [ring]}));
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// CQL2-JSON `and(anyinteracts(datetime, interval), =(collection, name))`.
pub fn cql2_filter(time_range: &TimeRange, collection: &str) -> Value {
    let [start, end] = time_range.to_interval_strings();
    json!({
        "op": "and",
        "args": [
            {
                "op": "anyinteracts",
                "args": [{"property": "datetime"}, {"interval": [start, end]}]
            },
            {
                "op": "=",
                "args": [{"property": "collection"}, collection]
            }
        ]
    })
}
