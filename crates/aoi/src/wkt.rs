//! WKT output for spatial SQL parameters.

use geo::{LineString, MultiPolygon, Polygon};
use std::fmt::Write;

/// Render a multipolygon as `MULTIPOLYGON (((x y, ...)), ...)`.
///
/// Coordinates use Rust's shortest round-trip float formatting, so the
/// database sees exactly the values held in memory.
pub fn multipolygon_to_wkt(geometry: &MultiPolygon<f64>) -> String {
    if geometry.0.is_empty() {
        return "MULTIPOLYGON EMPTY".to_string();
    }

    let mut out = String::from("MULTIPOLYGON (");
    for (i, polygon) in geometry.0.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_polygon(&mut out, polygon);
    }
    out.push(')');
    out
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>) {
    out.push('(');
    write_ring(out, polygon.exterior());
    for hole in polygon.interiors() {
        out.push_str(", ");
        write_ring(out, hole);
    }
    out.push(')');
}

fn write_ring(out: &mut String, ring: &LineString<f64>) {
    out.push('(');
    for (i, c) in ring.coords().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} {}", c.x, c.y);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_single_square() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.5, y: 0.0),
            (x: 1.5, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let wkt = multipolygon_to_wkt(&MultiPolygon::new(vec![square]));
        assert_eq!(
            wkt,
            "MULTIPOLYGON (((0 0, 1.5 0, 1.5 1, 0 1, 0 0)))"
        );
    }

    #[test]
    fn test_polygon_with_hole() {
        let poly = polygon!(
            exterior: [
                (x: 0.0, y: 0.0),
                (x: 4.0, y: 0.0),
                (x: 4.0, y: 4.0),
                (x: 0.0, y: 4.0),
            ],
            interiors: [
                [
                    (x: 1.0, y: 1.0),
                    (x: 2.0, y: 1.0),
                    (x: 2.0, y: 2.0),
                ],
            ],
        );
        let wkt = multipolygon_to_wkt(&MultiPolygon::new(vec![poly]));
        assert_eq!(
            wkt,
            "MULTIPOLYGON (((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 2 1, 2 2, 1 1)))"
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(
            multipolygon_to_wkt(&MultiPolygon::new(vec![])),
            "MULTIPOLYGON EMPTY"
        );
    }
}
