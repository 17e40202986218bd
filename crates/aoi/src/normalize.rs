//! Geometry normalization: reproject every feature and union into one AOI.

use crate::{AreaOfInterest, VectorDataset};
use ecohub_common::{EcohubError, EcohubResult};
use geo::{BooleanOps, Coord, Geometry, MapCoords, MultiPolygon, Polygon};
use projection::{CrsTransform, ProjectionError};
use tracing::{debug, instrument};

/// Turn an uploaded dataset into an [`AreaOfInterest`] in EPSG:4326.
///
/// Fails with `InvalidInput` when the dataset is empty, a feature has no
/// geometry, a feature is not polygonal, the CRS is unknown, or a
/// coordinate cannot be reprojected.
#[instrument(skip(dataset), fields(features = dataset.len(), crs = ?dataset.crs))]
pub fn normalize(dataset: &VectorDataset) -> EcohubResult<AreaOfInterest> {
    if dataset.is_empty() {
        return Err(EcohubError::InvalidInput("Dataset contains no features".into()));
    }

    let source_crs = dataset.crs.ok_or_else(|| {
        EcohubError::InvalidInput("Dataset has no coordinate reference system".into())
    })?;

    // Collect first so a bad feature anywhere rejects the whole dataset
    // before any reprojection work.
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for (idx, feature) in dataset.features.iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| EcohubError::InvalidInput(format!("Feature {} has no geometry", idx)))?;
        let before = polygons.len();
        collect_polygons(geometry, idx, &mut polygons)?;
        if polygons.len() == before {
            return Err(EcohubError::InvalidInput(format!(
                "Feature {} has empty geometry",
                idx
            )));
        }
    }

    let transform = CrsTransform::to_wgs84(source_crs);
    let reprojected = if transform.is_identity() {
        polygons
    } else {
        polygons
            .iter()
            .map(|p| reproject_polygon(p, &transform))
            .collect::<Result<Vec<_>, _>>()?
    };

    let unioned = union_all(reprojected);
    debug!(
        source_crs = %source_crs,
        parts = unioned.0.len(),
        "Normalized area of interest"
    );
    AreaOfInterest::new(unioned, source_crs)
}

fn collect_polygons(
    geometry: &Geometry<f64>,
    idx: usize,
    out: &mut Vec<Polygon<f64>>,
) -> EcohubResult<()> {
    match geometry {
        Geometry::Polygon(p) => {
            if !p.exterior().0.is_empty() {
                out.push(p.clone());
            }
        }
        Geometry::MultiPolygon(mp) => {
            out.extend(mp.0.iter().filter(|p| !p.exterior().0.is_empty()).cloned());
        }
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in gc.iter() {
                collect_polygons(g, idx, out)?;
            }
        }
        other => {
            return Err(EcohubError::InvalidInput(format!(
                "Feature {} is a {}; only polygons are supported",
                idx,
                geometry_kind(other)
            )));
        }
    }
    Ok(())
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn reproject_polygon(
    polygon: &Polygon<f64>,
    transform: &CrsTransform,
) -> Result<Polygon<f64>, ProjectionError> {
    polygon.try_map_coords(|c: Coord<f64>| {
        let (x, y) = transform.transform(c.x, c.y)?;
        Ok(Coord { x, y })
    })
}

fn union_all(polygons: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    if polygons.len() <= 1 {
        return MultiPolygon::new(polygons);
    }
    polygons
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, p| {
            acc.union(&MultiPolygon::new(vec![p]))
        })
}
