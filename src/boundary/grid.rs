//! Grid of sweep cell centers over a boundary.

use tracing::{debug, info, warn};

use super::Boundary;
use crate::models::GeoPoint;

/// Number of rows (and columns) for a requested cell count.
///
/// Rounds up, so the bounding-box lattice always has at least
/// `target_cells` cells before the containment filter.
pub fn grid_side(target_cells: u32) -> u32 {
    if target_cells == 0 {
        return 0;
    }
    f64::from(target_cells).sqrt().ceil() as u32
}

/// Generate cell centers inside the boundary.
///
/// The bounding box is split into `side x side` cells and each cell's
/// midpoint is kept only if the boundary strictly contains it. Output is
/// row-major, south to north then west to east, and is the same for the same
/// inputs. A degenerate bounding box or a zero target yields no cells.
pub fn generate_grid(boundary: &Boundary, target_cells: u32) -> Vec<GeoPoint> {
    let bbox = boundary.bbox();
    let side = grid_side(target_cells);

    if side == 0 || bbox.is_degenerate() {
        warn!(
            "No grid cells: target={}, bbox={:?}",
            target_cells, bbox
        );
        return Vec::new();
    }

    let lat_step = bbox.height() / f64::from(side);
    let lon_step = bbox.width() / f64::from(side);

    info!(
        "Generating {}x{} grid (lat step {:.5}, lon step {:.5})",
        side, side, lat_step, lon_step
    );

    let mut cells = Vec::new();
    for row in 0..side {
        let lat = bbox.min_lat + (f64::from(row) + 0.5) * lat_step;
        for col in 0..side {
            let lon = bbox.min_lon + (f64::from(col) + 0.5) * lon_step;
            if boundary.contains(lon, lat) {
                debug!("Cell added: {:.6}, {:.6}", lat, lon);
                cells.push(GeoPoint::new(lat, lon));
            }
        }
    }

    info!(
        "Generated {} grid cells ({} candidates)",
        cells.len(),
        u64::from(side) * u64::from(side)
    );

    cells
}
