//! Core data models for the sweep.

pub mod place;

pub use place::{GeoBbox, GeoPoint, IdentityKey, PlaceDetails, PlaceRecord, PlaceSummary};
