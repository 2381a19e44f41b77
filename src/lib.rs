//! Gridsweep - tile a boundary polygon into search cells and sweep a places
//! API over them.
//!
//! This library provides the grid generator, the paginated sweep and the
//! export used by the `gridsweep` binary.

pub mod boundary;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod notify;
pub mod places;
pub mod sweep;

pub use boundary::{generate_grid, load_boundary, Boundary};
pub use config::{DedupScope, SweepConfig};
pub use models::{GeoPoint, PlaceRecord};
pub use sweep::{SweepReport, Sweeper};
