//! Search-area boundary and grid generation.
//!
//! Loads the boundary polygon from GeoJSON and tiles its bounding box into
//! cell centers, keeping only the ones inside the polygon.

mod grid;
mod index;
mod loader;

use geo::{BoundingRect, MultiPolygon};

use crate::error::StartupError;
use crate::models::GeoBbox;

pub use grid::{generate_grid, grid_side};
pub use index::PolygonIndex;
pub use loader::{load_boundary, parse_boundary};

/// The search area, loaded once at startup and never mutated
pub struct Boundary {
    geometry: MultiPolygon<f64>,
    index: PolygonIndex,
    bbox: GeoBbox,
}

impl Boundary {
    /// Build a boundary from a multi-polygon. Fails if it has no polygons.
    pub fn new(geometry: MultiPolygon<f64>) -> Result<Self, StartupError> {
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| StartupError::BoundaryInvalid("boundary has no polygons".into()))?;

        let bbox = GeoBbox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y);
        let index = PolygonIndex::build(geometry.0.iter().cloned());

        Ok(Self {
            geometry,
            index,
            bbox,
        })
    }

    /// Bounding box of the whole boundary
    pub fn bbox(&self) -> GeoBbox {
        self.bbox
    }

    /// Point-in-polygon test; `lon`/`lat` in degrees
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.index.contains(lon, lat)
    }

    pub fn polygon_count(&self) -> usize {
        self.geometry.0.len()
    }
}
