//! Places search and details clients.

mod google;
mod service;
#[cfg(test)]
pub(crate) mod testing;

pub use google::GooglePlacesClient;
pub use service::{NearbyRequest, PlacesService, SearchPage};
