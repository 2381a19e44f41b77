//! Area sweep: paginated fetch per grid cell with dedup and quota back-off.

mod dedup;
mod fetch;
mod quota;
mod sweeper;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use dedup::DedupSet;
pub use fetch::{CellFetch, CellOutcome};
pub use quota::{until_next_day, Clock, QuotaGovernor, QuotaPolicy, QuotaState, SystemClock};
pub use sweeper::{SweepReport, SweepStats, Sweeper};

/// The sweep was cancelled while waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Sleep for `duration` unless `cancel` fires first
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        return Err(Cancelled);
    }
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
