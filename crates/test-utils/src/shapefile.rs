//! In-memory ESRI shapefile and zip builders for upload tests.

use geo::Polygon;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const SHAPE_TYPE_POLYGON: i32 = 5;

/// ESRI `.prj` text for WGS84 geographic coordinates.
pub const PRJ_WGS84: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

/// ESRI `.prj` text for WGS84 / UTM zone 19S.
pub const PRJ_UTM_19S: &str = r#"PROJCS["WGS_1984_UTM_Zone_19S",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",10000000.0],PARAMETER["Central_Meridian",-69.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

/// Encode polygons as a `.shp` file (shape type 5), one record per polygon.
///
/// Exterior rings are written clockwise and holes counter-clockwise, as the
/// format requires, regardless of the input orientation.
pub fn polygon_shp_bytes(polygons: &[Polygon<f64>]) -> Vec<u8> {
    let records: Vec<Vec<u8>> = polygons.iter().map(polygon_record).collect();

    let (min_x, min_y, max_x, max_y) = polygons
        .iter()
        .flat_map(|p| p.exterior().coords())
        .fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(a, b, c, d), pt| (a.min(pt.x), b.min(pt.y), c.max(pt.x), d.max(pt.y)),
        );

    let body_len: usize = records.iter().map(|r| 8 + r.len()).sum();
    let file_len_words = ((100 + body_len) / 2) as i32;

    let mut out = Vec::with_capacity(100 + body_len);
    out.extend_from_slice(&9994i32.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&file_len_words.to_be_bytes());
    out.extend_from_slice(&1000i32.to_le_bytes());
    out.extend_from_slice(&SHAPE_TYPE_POLYGON.to_le_bytes());
    for v in [min_x, min_y, max_x, max_y, 0.0, 0.0, 0.0, 0.0] {
        out.extend_from_slice(&v.to_le_bytes());
    }

    for (i, record) in records.iter().enumerate() {
        out.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        out.extend_from_slice(&((record.len() / 2) as i32).to_be_bytes());
        out.extend_from_slice(record);
    }
    out
}

fn polygon_record(polygon: &Polygon<f64>) -> Vec<u8> {
    let mut rings: Vec<Vec<(f64, f64)>> = Vec::new();
    rings.push(oriented(polygon.exterior(), true));
    for hole in polygon.interiors() {
        rings.push(oriented(hole, false));
    }

    let points: Vec<(f64, f64)> = rings.iter().flatten().copied().collect();
    let (min_x, min_y, max_x, max_y) = points.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(a, b, c, d), &(x, y)| (a.min(x), b.min(y), c.max(x), d.max(y)),
    );

    let mut rec = Vec::new();
    rec.extend_from_slice(&SHAPE_TYPE_POLYGON.to_le_bytes());
    for v in [min_x, min_y, max_x, max_y] {
        rec.extend_from_slice(&v.to_le_bytes());
    }
    rec.extend_from_slice(&(rings.len() as i32).to_le_bytes());
    rec.extend_from_slice(&(points.len() as i32).to_le_bytes());

    let mut start = 0i32;
    for ring in &rings {
        rec.extend_from_slice(&start.to_le_bytes());
        start += ring.len() as i32;
    }
    for (x, y) in points {
        rec.extend_from_slice(&x.to_le_bytes());
        rec.extend_from_slice(&y.to_le_bytes());
    }
    rec
}

/// Closed ring with the requested winding.
fn oriented(ring: &geo::LineString<f64>, clockwise: bool) -> Vec<(f64, f64)> {
    let mut pts: Vec<(f64, f64)> = ring.coords().map(|c| (c.x, c.y)).collect();
    if pts.first() != pts.last() {
        if let Some(&first) = pts.first() {
            pts.push(first);
        }
    }
    // Shoelace: positive signed area means counter-clockwise.
    let signed: f64 = pts
        .windows(2)
        .map(|w| w[0].0 * w[1].1 - w[1].0 * w[0].1)
        .sum();
    if (signed < 0.0) != clockwise {
        pts.reverse();
    }
    pts
}

/// Zip archive with `{stem}.shp`, and `{stem}.prj` when `prj` is given.
pub fn zipped_shapefile(stem: &str, shp: &[u8], prj: Option<&str>) -> Vec<u8> {
    let mut members: Vec<(String, &[u8])> = vec![(format!("{}.shp", stem), shp)];
    if let Some(prj) = prj {
        members.push((format!("{}.prj", stem), prj.as_bytes()));
    }
    zip_members(&members)
}

/// Zip archive containing the given (name, contents) members.
pub fn zip_members(members: &[(String, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer
            .start_file(name.as_str(), FileOptions::default())
            .expect("start zip member");
        writer.write_all(contents).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::square_polygon;

    #[test]
    fn test_header_length_matches_bytes() {
        let shp = polygon_shp_bytes(&[square_polygon(0.0, 0.0, 1.0)]);
        let words = i32::from_be_bytes([shp[24], shp[25], shp[26], shp[27]]);
        assert_eq!(words as usize * 2, shp.len());
        assert_eq!(i32::from_be_bytes([shp[0], shp[1], shp[2], shp[3]]), 9994);
    }

    #[test]
    fn test_exterior_written_clockwise() {
        let pts = oriented(square_polygon(0.0, 0.0, 1.0).exterior(), true);
        // Counter-clockwise input starts (0,0) -> (1,0); clockwise goes up first.
        assert_eq!(pts[0], (0.0, 0.0));
        assert_eq!(pts[1], (0.0, 1.0));
    }

    #[test]
    fn test_zip_starts_with_signature() {
        let zip = zipped_shapefile("aoi", b"shp", Some(PRJ_WGS84));
        assert!(zip.starts_with(b"PK\x03\x04"));
    }
}
