//! Zipped ESRI shapefile reader.

use crate::{Feature, VectorDataset};
use ::shapefile::{PolygonRing, Shape, ShapeReader};
use ecohub_common::{CrsCode, EcohubError, EcohubResult};
use geo::{
    Area, Contains, Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point,
    Polygon,
};
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Read the first `.shp` member of a zip archive, with its sibling `.prj`.
///
/// Without a `.prj` the dataset CRS is left unknown.
pub fn read_zipped_shapefile(bytes: &[u8]) -> EcohubResult<VectorDataset> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| EcohubError::InvalidInput(format!("Upload is not a valid zip archive: {}", e)))?;

    let shp_name = archive
        .file_names()
        .filter(|name| !name.starts_with("__MACOSX/"))
        .find(|name| name.to_ascii_lowercase().ends_with(".shp"))
        .map(str::to_string)
        .ok_or_else(|| EcohubError::InvalidInput("Zip archive contains no .shp file".into()))?;

    let stem = &shp_name[..shp_name.len() - ".shp".len()];
    let prj_name = archive
        .file_names()
        .find(|name| {
            name.len() == stem.len() + 4
                && name.starts_with(stem)
                && name.to_ascii_lowercase().ends_with(".prj")
        })
        .map(str::to_string);

    let shp_bytes = read_member(&mut archive, &shp_name)?;

    let crs = match prj_name {
        Some(prj_name) => {
            let prj = read_member(&mut archive, &prj_name)?;
            let wkt = String::from_utf8_lossy(&prj);
            Some(CrsCode::from_wkt(wkt.trim())?)
        }
        None => {
            warn!(shapefile = %shp_name, "Shapefile has no .prj; CRS unknown");
            None
        }
    };

    let shapes = ShapeReader::new(Cursor::new(shp_bytes))
        .and_then(|reader| reader.read())
        .map_err(|e| EcohubError::InvalidInput(format!("Invalid shapefile {}: {}", shp_name, e)))?;

    let features = shapes
        .into_iter()
        .enumerate()
        .map(|(idx, shape)| {
            Ok(Feature {
                id: Some(idx.to_string()),
                geometry: shape_to_geometry(shape)?,
            })
        })
        .collect::<EcohubResult<Vec<_>>>()?;

    debug!(shapefile = %shp_name, features = features.len(), crs = ?crs, "Read zipped shapefile");
    Ok(VectorDataset::new(crs, features))
}

fn read_member(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> EcohubResult<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| EcohubError::InvalidInput(format!("Cannot read {} from zip: {}", name, e)))?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)
        .map_err(|e| EcohubError::InvalidInput(format!("Cannot read {} from zip: {}", name, e)))?;
    Ok(buf)
}

/// Convert a shape record; Z and M ordinates are dropped.
fn shape_to_geometry(shape: Shape) -> EcohubResult<Option<Geometry<f64>>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Point::new(p.x, p.y).into(),
        Shape::PointM(p) => Point::new(p.x, p.y).into(),
        Shape::PointZ(p) => Point::new(p.x, p.y).into(),
        Shape::Multipoint(mp) => multipoint(mp.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::MultipointM(mp) => multipoint(mp.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::MultipointZ(mp) => multipoint(mp.points(), |p| Coord { x: p.x, y: p.y }),
        Shape::Polyline(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineM(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineZ(l) => lines(l.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::Polygon(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolygonM(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolygonZ(p) => polygons(p.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::Multipatch(_) => {
            return Err(EcohubError::InvalidInput(
                "Multipatch shapes are not supported".into(),
            ))
        }
    };
    Ok(Some(geometry))
}

fn multipoint<P>(points: &[P], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    MultiPoint::new(points.iter().map(|p| Point::from(xy(p))).collect()).into()
}

fn lines<P>(parts: &[Vec<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    MultiLineString::new(
        parts
            .iter()
            .map(|part| LineString::new(part.iter().map(&xy).collect()))
            .collect(),
    )
    .into()
}

/// Group rings into polygons. Each inner ring becomes a hole of the smallest
/// outer ring containing it, whatever order the rings are stored in; an inner
/// ring that no outer ring contains is kept as a polygon of its own.
fn polygons<P>(rings: &[PolygonRing<P>], xy: impl Fn(&P) -> Coord<f64>) -> Geometry<f64> {
    let ring_of = |points: &Vec<P>| LineString::new(points.iter().map(&xy).collect());

    let mut shells: Vec<Polygon<f64>> = Vec::new();
    let mut inners: Vec<LineString<f64>> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => shells.push(Polygon::new(ring_of(points), Vec::new())),
            PolygonRing::Inner(points) => inners.push(ring_of(points)),
        }
    }

    let mut holes: Vec<Vec<LineString<f64>>> = vec![Vec::new(); shells.len()];
    for inner in inners {
        let owner = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.contains(&inner))
            .min_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .map(|(idx, _)| idx);
        match owner {
            Some(idx) => holes[idx].push(inner),
            None => {
                warn!("Inner ring lies outside every outer ring; keeping it as a polygon");
                shells.push(Polygon::new(inner, Vec::new()));
                holes.push(Vec::new());
            }
        }
    }

    MultiPolygon::new(
        shells
            .into_iter()
            .zip(holes)
            .map(|(shell, holes)| Polygon::new(shell.into_inner().0, holes))
            .collect(),
    )
    .into()
}
