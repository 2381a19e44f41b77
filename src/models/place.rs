//! Place records collected by the sweep.

use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon), used as the center of a sweep cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBbox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBbox {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when the box has no area (or is not finite) and cannot be tiled
    pub fn is_degenerate(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0
    }
}

/// One result row from a nearby search, before the details lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    /// Short address ("vicinity" in the Google API)
    pub address: String,
}

impl PlaceSummary {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}

/// Contact fields from the details lookup. Missing values stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDetails {
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// Deduplication key: two records with the same name and address are the same place
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub name: String,
    pub address: String,
}

/// A place kept in the sweep output, one spreadsheet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceRecord {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
}

impl PlaceRecord {
    /// Build a record from a search summary and its details
    pub fn from_parts(summary: PlaceSummary, details: PlaceDetails) -> Self {
        Self {
            name: summary.name,
            address: summary.address,
            phone: details.phone.unwrap_or_default(),
            website: details.website.unwrap_or_default(),
        }
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey {
            name: self.name.clone(),
            address: self.address.clone(),
        }
    }
}
