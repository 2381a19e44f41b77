//! Google Places (legacy JSON API) client.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::service::{NearbyRequest, PlacesService, SearchPage};
use crate::error::{ServiceError, ServiceResult, StartupError};
use crate::models::{PlaceDetails, PlaceSummary};

const GOOGLE_PLACES_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";
const DETAILS_FIELDS: &str = "formatted_phone_number,website";

/// Places client backed by the Nearby Search and Place Details endpoints
pub struct GooglePlacesClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<NearbyResult>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    #[serde(default)]
    place_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    vicinity: String,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    formatted_phone_number: Option<String>,
    website: Option<String>,
}

impl GooglePlacesClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, StartupError> {
        let client = Client::builder()
            .user_agent(concat!("gridsweep/", env!("CARGO_PKG_VERSION")))
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GOOGLE_PLACES_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (proxies, local fakes)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> ServiceResult<Url> {
        let mut all: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.push(("key", self.api_key.as_str()));
        Url::parse_with_params(&format!("{}/{}", self.base_url, path), &all)
            .map_err(|e| ServiceError::Permanent(format!("invalid URL: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ServiceResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::Permanent(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(ServiceError::Permanent(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Permanent(format!("invalid response body: {}", e)))
    }
}

/// Map the API's `status` field to a result
fn check_status(status: &str, error_message: Option<String>) -> ServiceResult<()> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" => Err(ServiceError::RateLimited(
            error_message.unwrap_or_else(|| status.to_string()),
        )),
        other => Err(ServiceError::Permanent(match error_message {
            Some(msg) => format!("{}: {}", other, msg),
            None => other.to_string(),
        })),
    }
}

fn into_search_page(response: NearbyResponse) -> ServiceResult<SearchPage> {
    check_status(&response.status, response.error_message)?;
    Ok(SearchPage {
        results: response
            .results
            .into_iter()
            .map(|r| PlaceSummary {
                place_id: r.place_id,
                name: r.name,
                address: r.vicinity,
            })
            .collect(),
        next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
    })
}

fn into_details(response: DetailsResponse) -> ServiceResult<PlaceDetails> {
    check_status(&response.status, response.error_message)?;
    Ok(response
        .result
        .map(|r| PlaceDetails {
            phone: r.formatted_phone_number,
            website: r.website,
        })
        .unwrap_or_default())
}

#[async_trait]
impl PlacesService for GooglePlacesClient {
    async fn nearby_search(&self, request: &NearbyRequest) -> ServiceResult<SearchPage> {
        // A page token replaces every other parameter
        let params = match &request.page_token {
            Some(token) => vec![("pagetoken", token.clone())],
            None => {
                let mut params = vec![
                    ("location", request.location.to_string()),
                    ("radius", request.radius_m.to_string()),
                    ("type", request.place_type.clone()),
                ];
                if let Some(keyword) = &request.keyword {
                    params.push(("keyword", keyword.clone()));
                }
                params
            }
        };

        let url = self.endpoint("nearbysearch/json", &params)?;
        debug!("Nearby search at {} (page token: {})", request.location, request.page_token.is_some());

        into_search_page(self.get_json(url).await?)
    }

    async fn place_details(&self, place_id: &str) -> ServiceResult<PlaceDetails> {
        let url = self.endpoint(
            "details/json",
            &[
                ("place_id", place_id.to_string()),
                ("fields", DETAILS_FIELDS.to_string()),
            ],
        )?;

        into_details(self.get_json(url).await?)
    }
}
