//! CSV export of sweep results and grid cells.

use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;
use tracing::{error, info, warn};

use crate::error::ExportError;
use crate::models::{GeoPoint, PlaceRecord};

pub const PLACE_HEADERS: [&str; 4] = ["Name", "Address", "Phone Number", "Website"];
pub const GRID_HEADERS: [&str; 2] = ["latitude", "longitude"];

/// Write places to `path`, replacing any existing file.
///
/// The header row is written even when there are no records.
pub fn write_places(path: &Path, records: &[PlaceRecord]) -> Result<(), ExportError> {
    info!("Writing {} places to {}", records.len(), path.display());

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    writer
        .write_record(PLACE_HEADERS)
        .map_err(|source| csv_error(path, source))?;

    for record in records {
        writer
            .write_record([
                record.name.as_str(),
                record.address.as_str(),
                record.phone.as_str(),
                record.website.as_str(),
            ])
            .map_err(|source| csv_error(path, source))?;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

/// Result of [`write_places_or_fallback`]
#[derive(Debug)]
pub enum PlacesExport {
    /// Written to the requested path
    Written(PathBuf),
    /// The requested path failed, the rows were saved to `saved_to` instead
    Fallback { error: ExportError, saved_to: PathBuf },
    /// Both the requested path and the fallback failed
    Failed {
        error: ExportError,
        fallback_error: ExportError,
    },
}

/// Write places to `path`. If that fails, retry once to a timestamped file
/// in `fallback_dir` so the collected rows survive.
pub fn write_places_or_fallback(
    path: &Path,
    records: &[PlaceRecord],
    fallback_dir: &Path,
) -> PlacesExport {
    let error = match write_places(path, records) {
        Ok(()) => return PlacesExport::Written(path.to_path_buf()),
        Err(e) => e,
    };
    error!("{}", error);

    let fallback = fallback_path(path, fallback_dir);
    warn!("Retrying export to {}", fallback.display());
    match write_places(&fallback, records) {
        Ok(()) => PlacesExport::Fallback {
            error,
            saved_to: fallback,
        },
        Err(fallback_error) => {
            error!("{}", fallback_error);
            PlacesExport::Failed {
                error,
                fallback_error,
            }
        }
    }
}

fn fallback_path(path: &Path, dir: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("places");
    dir.join(format!("{}_{}.csv", stem, Utc::now().format("%Y%m%dT%H%M%S")))
}

/// Write grid cell centers to `path`, replacing any existing file
pub fn write_grid(path: &Path, cells: &[GeoPoint]) -> Result<(), ExportError> {
    info!("Writing {} grid cells to {}", cells.len(), path.display());

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|source| csv_error(path, source))?;

    writer
        .write_record(GRID_HEADERS)
        .map_err(|source| csv_error(path, source))?;

    for cell in cells {
        writer
            .write_record([format!("{:.6}", cell.lat), format!("{:.6}", cell.lon)])
            .map_err(|source| csv_error(path, source))?;
    }

    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

fn csv_error(path: &Path, source: csv::Error) -> ExportError {
    ExportError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
