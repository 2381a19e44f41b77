//! Paginated fetch for a single grid cell.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::quota::QuotaGovernor;
use super::sweeper::Sweeper;
use super::{pause, Cancelled};
use crate::config::DedupScope;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{GeoPoint, PlaceDetails, PlaceRecord};
use crate::places::{NearbyRequest, PlacesService};

/// How a cell's fetch loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellOutcome {
    /// The last page had no cursor
    Exhausted,
    /// A request failed for good; results from earlier pages are kept
    Failed(ServiceError),
    /// The cancellation token fired; results gathered so far are kept
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFetch {
    pub records: Vec<PlaceRecord>,
    pub pages: u32,
    pub duplicates: u64,
    pub outcome: CellOutcome,
}

enum RequestError {
    Service(ServiceError),
    Cancelled,
}

impl From<Cancelled> for RequestError {
    fn from(_: Cancelled) -> Self {
        RequestError::Cancelled
    }
}

struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

/// Issue one request through the quota governor, retrying rate limits.
///
/// Every attempt, retries included, counts against the quota.
async fn call_with_retry<T, F, Fut>(
    quota: &mut QuotaGovernor,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let mut attempt = 0;
    loop {
        quota.acquire(cancel).await?;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < retry.max_retries => {
                attempt += 1;
                warn!(
                    "{} (retry {}/{} in {:?})",
                    e, attempt, retry.max_retries, retry.delay
                );
                pause(retry.delay, cancel).await?;
            }
            Err(e) => return Err(RequestError::Service(e)),
        }
    }
}

impl<S: PlacesService> Sweeper<S> {
    /// Fetch every result page around `location`.
    ///
    /// Known identity keys are skipped before their details lookup, so
    /// duplicates cost no extra request. A failed details lookup keeps the
    /// place with empty phone and website.
    pub async fn fetch_cell(&mut self, location: GeoPoint) -> CellFetch {
        if self.config.dedup_scope == DedupScope::Cell {
            self.dedup.clear();
        }

        let retry = RetryPolicy {
            max_retries: self.config.max_rate_limit_retries,
            delay: self.config.delays.rate_limit_retry(),
        };
        let settle = self.config.delays.page_settle();

        let mut request = NearbyRequest {
            location,
            radius_m: self.config.radius_m,
            place_type: self.config.place_type.clone(),
            keyword: self.config.keyword.clone(),
            page_token: None,
        };

        let mut fetch = CellFetch {
            records: Vec::new(),
            pages: 0,
            duplicates: 0,
            outcome: CellOutcome::Exhausted,
        };

        loop {
            let service = &self.service;
            let req = &request;
            let page = match call_with_retry(&mut self.quota, &retry, &self.cancel, move || {
                service.nearby_search(req)
            })
            .await
            {
                Ok(page) => page,
                Err(RequestError::Cancelled) => {
                    fetch.outcome = CellOutcome::Cancelled;
                    break;
                }
                Err(RequestError::Service(e)) => {
                    warn!("Search failed at {}: {}", location, e);
                    fetch.outcome = CellOutcome::Failed(e);
                    break;
                }
            };

            fetch.pages += 1;
            debug!(
                "Page {}: {} results, more: {}",
                fetch.pages,
                page.results.len(),
                page.next_page_token.is_some()
            );

            for summary in page.results {
                if !self.dedup.insert(summary.identity_key()) {
                    fetch.duplicates += 1;
                    debug!("Duplicate skipped: {}, {}", summary.name, summary.address);
                    continue;
                }

                let service = &self.service;
                let place_id = summary.place_id.as_str();
                let details = if place_id.is_empty() {
                    debug!("No place id for {}, skipping details", summary.name);
                    PlaceDetails::default()
                } else {
                    match call_with_retry(&mut self.quota, &retry, &self.cancel, move || {
                        service.place_details(place_id)
                    })
                    .await
                    {
                        Ok(details) => details,
                        Err(RequestError::Cancelled) => {
                            fetch.outcome = CellOutcome::Cancelled;
                            return fetch;
                        }
                        Err(RequestError::Service(e)) => {
                            warn!("Details lookup failed for {}: {}", summary.place_id, e);
                            PlaceDetails::default()
                        }
                    }
                };

                let record = PlaceRecord::from_parts(summary, details);
                info!("Found place: {}, {}", record.name, record.address);
                fetch.records.push(record);
            }

            match page.next_page_token {
                None => {
                    debug!("No more pages at {}", location);
                    break;
                }
                Some(token) => {
                    // A fresh token is rejected until the service has settled it
                    if pause(settle, &self.cancel).await.is_err() {
                        fetch.outcome = CellOutcome::Cancelled;
                        break;
                    }
                    request = request.with_page_token(token);
                }
            }
        }

        fetch
    }
}
