//! Boundary loading from GeoJSON.

use std::fs;
use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;
use tracing::{debug, info};

use super::Boundary;
use crate::error::StartupError;

/// Load the boundary from a GeoJSON file.
///
/// Accepts a `FeatureCollection` (the first feature's geometry is used), a
/// single `Feature`, or a bare geometry. The geometry must be a `Polygon` or
/// `MultiPolygon`.
pub fn load_boundary(path: &Path) -> Result<Boundary, StartupError> {
    if !path.exists() {
        return Err(StartupError::BoundaryMissing(path.to_path_buf()));
    }

    info!("Loading boundary from {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| StartupError::BoundaryRead {
        path: path.to_path_buf(),
        source,
    })?;

    let boundary = parse_boundary(&content)?;

    info!(
        "Boundary loaded: {} polygon(s), bbox {:?}",
        boundary.polygon_count(),
        boundary.bbox()
    );

    Ok(boundary)
}

/// Parse a boundary from GeoJSON text
pub fn parse_boundary(content: &str) -> Result<Boundary, StartupError> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| StartupError::BoundaryInvalid(e.to_string()))?;

    let geometry = match geojson {
        GeoJson::FeatureCollection(fc) => {
            debug!("FeatureCollection with {} features", fc.features.len());
            fc.features
                .into_iter()
                .next()
                .ok_or_else(|| StartupError::BoundaryInvalid("feature collection is empty".into()))?
                .geometry
        }
        GeoJson::Feature(feature) => feature.geometry,
        GeoJson::Geometry(geometry) => Some(geometry),
    }
    .ok_or_else(|| StartupError::BoundaryInvalid("feature has no geometry".into()))?;

    let geo_geom: geo::Geometry<f64> = geometry
        .try_into()
        .map_err(|e: geojson::Error| StartupError::BoundaryInvalid(e.to_string()))?;

    let multi_polygon = match geo_geom {
        geo::Geometry::MultiPolygon(mp) => mp,
        geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
        other => {
            return Err(StartupError::BoundaryInvalid(format!(
                "expected Polygon or MultiPolygon, got {}",
                geometry_kind(&other)
            )))
        }
    };

    Boundary::new(multi_polygon)
}

fn geometry_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::Line(_) => "Line",
        geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::Polygon(_) => "Polygon",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        geo::Geometry::MultiPolygon(_) => "MultiPolygon",
        geo::Geometry::GeometryCollection(_) => "GeometryCollection",
        geo::Geometry::Rect(_) => "Rect",
        geo::Geometry::Triangle(_) => "Triangle",
    }
}
