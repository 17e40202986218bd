//! GeoJSON reader.

use crate::{Feature, VectorDataset};
use ::geojson::{GeoJson, JsonObject};
use ecohub_common::{CrsCode, EcohubError, EcohubResult};
use geo::Geometry;
use tracing::debug;

/// Parse a GeoJSON FeatureCollection, Feature or bare Geometry.
///
/// RFC 7946 data is EPSG:4326. The pre-RFC `crs` member is still honoured
/// because GIS exports frequently carry it with projected coordinates.
pub fn read_geojson(bytes: &[u8]) -> EcohubResult<VectorDataset> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EcohubError::InvalidInput(format!("GeoJSON is not valid UTF-8: {}", e)))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| EcohubError::InvalidInput(format!("Invalid GeoJSON: {}", e)))?;

    let (features, foreign) = match geojson {
        GeoJson::FeatureCollection(fc) => {
            let features = fc
                .features
                .into_iter()
                .map(convert_feature)
                .collect::<EcohubResult<Vec<_>>>()?;
            (features, fc.foreign_members)
        }
        GeoJson::Feature(f) => {
            let foreign = f.foreign_members.clone();
            (vec![convert_feature(f)?], foreign)
        }
        GeoJson::Geometry(g) => {
            let foreign = g.foreign_members.clone();
            (vec![Feature::new(convert_geometry(g)?)], foreign)
        }
    };

    let crs = match foreign.as_ref().and_then(|members| members.get("crs")) {
        Some(crs) => Some(legacy_crs(crs)?),
        None => Some(CrsCode::Epsg4326),
    };

    debug!(features = features.len(), crs = ?crs, "Read GeoJSON upload");
    Ok(VectorDataset::new(crs, features))
}

fn convert_feature(feature: ::geojson::Feature) -> EcohubResult<Feature> {
    let id = feature.id.map(|id| match id {
        ::geojson::feature::Id::String(s) => s,
        ::geojson::feature::Id::Number(n) => n.to_string(),
    });
    let geometry = feature.geometry.map(convert_geometry).transpose()?;
    Ok(Feature { id, geometry })
}

fn convert_geometry(geometry: ::geojson::Geometry) -> EcohubResult<Geometry<f64>> {
    Geometry::<f64>::try_from(geometry.value)
        .map_err(|e| EcohubError::InvalidInput(format!("Invalid GeoJSON geometry: {}", e)))
}

/// Interpret a legacy `{"type": "name", "properties": {"name": ...}}` or
/// `{"type": "EPSG", "properties": {"code": ...}}` CRS member.
fn legacy_crs(crs: &serde_json::Value) -> EcohubResult<CrsCode> {
    let properties: Option<&JsonObject> = crs.get("properties").and_then(|p| p.as_object());

    let parsed = match crs.get("type").and_then(|t| t.as_str()) {
        Some("name") => properties
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(CrsCode::from_identifier),
        Some("EPSG") => properties
            .and_then(|p| p.get("code"))
            .and_then(|c| c.as_u64())
            .map(|code| CrsCode::from_epsg(code as u32)),
        _ => None,
    };

    match parsed {
        Some(result) => Ok(result?),
        None => Err(EcohubError::InvalidInput(format!(
            "Unrecognized GeoJSON crs member: {}",
            crs
        ))),
    }
}
