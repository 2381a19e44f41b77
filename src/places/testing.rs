//! In-memory places service for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::service::{NearbyRequest, PlacesService, SearchPage};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{PlaceDetails, PlaceSummary};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search(NearbyRequest),
    Details(String),
}

/// Replays queued search responses in order and answers details from a map.
///
/// An exhausted search queue answers with an empty last page. Unknown place
/// ids get empty details.
#[derive(Default)]
pub struct ScriptedService {
    searches: Mutex<VecDeque<ServiceResult<SearchPage>>>,
    details: Mutex<HashMap<String, VecDeque<ServiceResult<PlaceDetails>>>>,
    calls: Mutex<Vec<(Call, Instant)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_search(&self, response: ServiceResult<SearchPage>) -> &Self {
        self.searches.lock().unwrap().push_back(response);
        self
    }

    pub fn push_page(&self, results: Vec<PlaceSummary>, next: Option<&str>) -> &Self {
        self.push_search(Ok(page(results, next)))
    }

    pub fn push_details(&self, place_id: &str, response: ServiceResult<PlaceDetails>) -> &Self {
        self.details
            .lock()
            .unwrap()
            .entry(place_id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn search_calls(&self) -> Vec<NearbyRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search(r) => Some(r),
                Call::Details(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl PlacesService for ScriptedService {
    async fn nearby_search(&self, request: &NearbyRequest) -> ServiceResult<SearchPage> {
        self.calls
            .lock()
            .unwrap()
            .push((Call::Search(request.clone()), Instant::now()));
        self.searches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn place_details(&self, place_id: &str) -> ServiceResult<PlaceDetails> {
        self.calls
            .lock()
            .unwrap()
            .push((Call::Details(place_id.to_string()), Instant::now()));
        self.details
            .lock()
            .unwrap()
            .get_mut(place_id)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| Ok(PlaceDetails::default()))
    }
}

pub fn summary(place_id: &str, name: &str, address: &str) -> PlaceSummary {
    PlaceSummary {
        place_id: place_id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
    }
}

pub fn page(results: Vec<PlaceSummary>, next: Option<&str>) -> SearchPage {
    SearchPage {
        results,
        next_page_token: next.map(str::to_string),
    }
}

pub fn rate_limited() -> ServiceResult<SearchPage> {
    Err(ServiceError::RateLimited("OVER_QUERY_LIMIT".into()))
}

pub fn permanent(reason: &str) -> ServiceResult<SearchPage> {
    Err(ServiceError::Permanent(reason.into()))
}
