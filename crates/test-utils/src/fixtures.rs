//! Common test fixtures for ecohub tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in biomass extraction.

/// Common bounding box definitions for testing, as (min_x, min_y, max_x, max_y).
pub mod bbox {
    /// A one-degree square in western Acre, Brazil (UTM zone 19S)
    pub const ACRE: (f64, f64, f64, f64) = (-70.0, -11.0, -69.0, -10.0);

    /// A small AOI inside [`ACRE`]
    pub const ACRE_PLOT: (f64, f64, f64, f64) = (-69.6, -10.6, -69.4, -10.4);

    /// Open South Atlantic, outside every land reference layer
    pub const SOUTH_ATLANTIC: (f64, f64, f64, f64) = (-20.0, -30.0, -19.0, -29.0);
}

/// STAC API response fixtures.
pub mod stac {
    use serde_json::{json, Value};

    /// Collection the biomass pipeline queries.
    pub const BIOMASS_COLLECTION: &str = "chloris-biomass";

    /// A STAC item with one `biomass` asset.
    pub fn biomass_item(id: &str, datetime: &str, href: &str) -> Value {
        json!({
            "type": "Feature",
            "stac_version": "1.0.0",
            "id": id,
            "collection": BIOMASS_COLLECTION,
            "bbox": [-80.0, -20.0, -60.0, 0.0],
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-80.0, -20.0], [-60.0, -20.0], [-60.0, 0.0], [-80.0, 0.0], [-80.0, -20.0]]]
            },
            "properties": {
                "datetime": datetime,
                "proj:epsg": 4326
            },
            "assets": {
                "biomass": {
                    "href": href,
                    "type": "image/tiff; application=geotiff; profile=cloud-optimized",
                    "roles": ["data"]
                }
            },
            "links": []
        })
    }

    /// An ItemCollection page, optionally with a `next` link.
    pub fn item_collection(items: Vec<Value>, next: Option<Value>) -> Value {
        let mut links = vec![json!({"rel": "self", "href": "http://localhost/search"})];
        if let Some(next) = next {
            links.push(next);
        }
        json!({
            "type": "FeatureCollection",
            "features": items,
            "links": links,
        })
    }

    /// A `next` link that re-POSTs the search with a paging token.
    pub fn post_next_link(href: &str, token: &str) -> Value {
        json!({
            "rel": "next",
            "href": href,
            "method": "POST",
            "body": {"token": token},
            "merge": true
        })
    }

    /// A `next` link followed with GET.
    pub fn get_next_link(href: &str) -> Value {
        json!({"rel": "next", "href": href, "type": "application/geo+json"})
    }

    /// Planetary Computer SAS token response.
    pub fn sas_token(token: &str) -> Value {
        json!({"msft:expiry": "2030-01-01T00:00:00Z", "token": token})
    }
}

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 / UTM zone 19S, as a legacy GeoJSON crs name
    pub const UTM_19S_URN: &str = "urn:ogc:def:crs:EPSG::32719";
}
