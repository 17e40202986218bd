//! Synthetic rasters and polygons.

use geo::{polygon, MultiPolygon, Polygon};

/// Creates a grid where every cell holds `value`.
pub fn constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with every `stride`-th cell set to NaN.
pub fn with_nan_holes(mut data: Vec<f32>, stride: usize) -> Vec<f32> {
    for (i, v) in data.iter_mut().enumerate() {
        if stride > 0 && i % stride == 0 {
            *v = f32::NAN;
        }
    }
    data
}

/// Axis-aligned square with its lower-left corner at (`min_x`, `min_y`).
pub fn square_polygon(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
    rect_polygon(min_x, min_y, min_x + size, min_y + size)
}

/// Axis-aligned rectangle polygon (counter-clockwise exterior).
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: max_x, y: min_y),
        (x: max_x, y: max_y),
        (x: min_x, y: max_y),
    ]
}

/// Wrap polygons into a multipolygon.
pub fn multi(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons)
}

/// GeoJSON FeatureCollection text with one Feature per polygon.
///
/// Pass `crs_name` to attach a legacy `crs` member (e.g.
/// `"urn:ogc:def:crs:EPSG::32719"`).
pub fn polygons_geojson(polygons: &[Polygon<f64>], crs_name: Option<&str>) -> String {
    let features: Vec<serde_json::Value> = polygons
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut rings = vec![ring_json(p.exterior())];
            rings.extend(p.interiors().iter().map(ring_json));
            serde_json::json!({
                "type": "Feature",
                "id": i,
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": rings}
            })
        })
        .collect();

    let mut doc = serde_json::json!({
        "type": "FeatureCollection",
        "features": features,
    });
    if let Some(name) = crs_name {
        doc["crs"] = serde_json::json!({"type": "name", "properties": {"name": name}});
    }
    doc.to_string()
}

fn ring_json(ring: &geo::LineString<f64>) -> serde_json::Value {
    serde_json::Value::Array(
        ring.coords()
            .map(|c| serde_json::json!([c.x, c.y]))
            .collect(),
    )
}
