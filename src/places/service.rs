//! Remote places service boundary.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::models::{GeoPoint, PlaceDetails, PlaceSummary};

/// One nearby-search call
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyRequest {
    pub location: GeoPoint,
    pub radius_m: u32,
    pub place_type: String,
    pub keyword: Option<String>,
    /// Cursor from the previous page; `None` for the first page
    pub page_token: Option<String>,
}

impl NearbyRequest {
    /// Same search, next page
    pub fn with_page_token(&self, token: String) -> Self {
        Self {
            page_token: Some(token),
            ..self.clone()
        }
    }
}

/// One page of nearby-search results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub results: Vec<PlaceSummary>,
    /// Present when more results exist
    pub next_page_token: Option<String>,
}

/// Places search and details lookups.
///
/// Implementations report failures as [`ServiceError`](crate::error::ServiceError)
/// so callers can tell a rate limit from a permanent failure without
/// inspecting messages.
#[async_trait]
pub trait PlacesService: Send + Sync {
    async fn nearby_search(&self, request: &NearbyRequest) -> ServiceResult<SearchPage>;

    async fn place_details(&self, place_id: &str) -> ServiceResult<PlaceDetails>;
}
