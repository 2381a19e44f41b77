//! Sequential sweep over grid cells.

use std::sync::Arc;

use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use super::dedup::DedupSet;
use super::fetch::CellOutcome;
use super::pause;
use super::quota::{Clock, QuotaGovernor, QuotaPolicy, SystemClock};
use crate::config::SweepConfig;
use crate::models::{GeoPoint, PlaceRecord};
use crate::places::PlacesService;

/// Runs the paginated fetch for each cell in order and collects the results
pub struct Sweeper<S> {
    pub(super) service: S,
    pub(super) config: SweepConfig,
    pub(super) quota: QuotaGovernor,
    pub(super) dedup: DedupSet,
    pub(super) cancel: CancellationToken,
    progress: ProgressBar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub cells_total: usize,
    pub cells_processed: usize,
    pub cells_exhausted: usize,
    pub cells_failed: usize,
    pub pages: u64,
    pub duplicates: u64,
    pub requests: u64,
    pub throttles: u64,
    pub day_waits: u64,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Kept records in discovery order
    pub records: Vec<PlaceRecord>,
    pub stats: SweepStats,
}

impl<S: PlacesService> Sweeper<S> {
    pub fn new(service: S, config: SweepConfig) -> Self {
        let policy = QuotaPolicy::from(&config.quota);
        Self {
            service,
            config,
            quota: QuotaGovernor::new(policy, Arc::new(SystemClock)),
            dedup: DedupSet::new(),
            cancel: CancellationToken::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Replace the wall clock used for the daily quota boundary
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        let policy = QuotaPolicy::from(&self.config.quota);
        self.quota = QuotaGovernor::new(policy, clock);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Sweep all cells in order.
    ///
    /// A failed cell is logged and skipped. Cancellation stops the sweep at
    /// the next wait; everything gathered until then is in the report.
    pub async fn sweep(&mut self, cells: &[GeoPoint]) -> SweepReport {
        let mut report = SweepReport {
            records: Vec::new(),
            stats: SweepStats {
                cells_total: cells.len(),
                ..SweepStats::default()
            },
        };

        info!(
            "Sweeping {} cells for '{}' (type {}, radius {} m, dedup {:?})",
            cells.len(),
            self.config.query,
            self.config.place_type,
            self.config.radius_m,
            self.config.dedup_scope
        );
        self.progress.set_length(cells.len() as u64);

        for (i, cell) in cells.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.stats.cancelled = true;
                break;
            }

            let span = info_span!("cell", index = i + 1, lat = cell.lat, lon = cell.lon);
            let fetch = self.fetch_cell(*cell).instrument(span).await;

            let stats = &mut report.stats;
            stats.cells_processed += 1;
            stats.pages += u64::from(fetch.pages);
            stats.duplicates += fetch.duplicates;

            info!(
                "Cell {}/{} at {}: {} new places, {} duplicates",
                i + 1,
                cells.len(),
                cell,
                fetch.records.len(),
                fetch.duplicates
            );
            report.records.extend(fetch.records);
            self.progress.inc(1);

            match fetch.outcome {
                CellOutcome::Exhausted => stats.cells_exhausted += 1,
                CellOutcome::Failed(e) => {
                    warn!("Cell {}/{} failed: {}", i + 1, cells.len(), e);
                    stats.cells_failed += 1;
                }
                CellOutcome::Cancelled => {
                    stats.cancelled = true;
                    break;
                }
            }

            if i + 1 < cells.len() && pause(self.config.delays.between_cells(), &self.cancel).await.is_err() {
                report.stats.cancelled = true;
                break;
            }
        }

        report.stats.requests = self.quota.total();
        report.stats.throttles = self.quota.throttles();
        report.stats.day_waits = self.quota.day_waits();

        if report.stats.cancelled {
            warn!(
                "Sweep cancelled after {}/{} cells",
                report.stats.cells_processed, report.stats.cells_total
            );
            self.progress.abandon_with_message("cancelled");
        } else {
            self.progress.finish_with_message("done");
        }

        info!(
            "Sweep finished: {} places, {} duplicates skipped, {} failed cells, {} requests",
            report.records.len(),
            report.stats.duplicates,
            report.stats.cells_failed,
            report.stats.requests
        );

        report
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn quota(&self) -> &QuotaGovernor {
        &self.quota
    }

    pub fn dedup(&self) -> &DedupSet {
        &self.dedup
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::config::{DedupScope, DelayConfig, QuotaConfig};
    use crate::places::testing::{permanent, summary, ScriptedService};

    fn config(scope: DedupScope) -> SweepConfig {
        SweepConfig {
            dedup_scope: scope,
            delays: DelayConfig::none(),
            quota: QuotaConfig {
                per_minute: 0,
                per_day: 0,
                cooldown_secs: 60,
            },
            ..SweepConfig::default()
        }
    }

    fn cells(n: usize) -> Vec<GeoPoint> {
        (0..n).map(|i| GeoPoint::new(40.0 + i as f64 * 0.1, -3.0)).collect()
    }

    /// Two neighbouring cells whose radii both cover "Hotel Sol"
    fn overlapping_service() -> ScriptedService {
        let service = ScriptedService::new();
        service
            .push_page(vec![summary("a", "Hotel Sol", "Calle 1"), summary("b", "Hostal Mar", "Paseo 2")], None)
            .push_page(vec![summary("a", "Hotel Sol", "Calle 1"), summary("c", "Pension Rio", "Ribera 3")], None);
        service
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_scope_dedups_across_cells() {
        let mut sweeper = Sweeper::new(overlapping_service(), config(DedupScope::Sweep));
        let report = sweeper.sweep(&cells(2)).await;

        let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Hotel Sol", "Hostal Mar", "Pension Rio"]);
        assert_eq!(report.stats.duplicates, 1);
        assert_eq!(report.stats.cells_exhausted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cell_scope_keeps_cross_cell_repeats() {
        let mut sweeper = Sweeper::new(overlapping_service(), config(DedupScope::Cell));
        let report = sweeper.sweep(&cells(2)).await;

        assert_eq!(report.records.len(), 4);
        assert_eq!(report.stats.duplicates, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cell_does_not_stop_sweep() {
        let service = ScriptedService::new();
        service
            .push_search(permanent("UNKNOWN_ERROR"))
            .push_page(vec![summary("b", "Hostal Mar", "Paseo 2")], None);

        let mut sweeper = Sweeper::new(service, config(DedupScope::Sweep));
        let report = sweeper.sweep(&cells(2)).await;

        assert_eq!(report.stats.cells_failed, 1);
        assert_eq!(report.stats.cells_exhausted, 1);
        assert_eq!(report.stats.cells_processed, 2);
        assert_eq!(report.records.len(), 1);
        assert!(!report.stats.cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_cells() {
        let mut config = config(DedupScope::Sweep);
        config.delays.between_cells_ms = 1000;
        let mut sweeper = Sweeper::new(ScriptedService::new(), config);

        let start = Instant::now();
        let report = sweeper.sweep(&cells(3)).await;

        // No wait after the last cell
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_secs(3));
        assert_eq!(report.stats.requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_cells_keeps_results() {
        let service = ScriptedService::new();
        service
            .push_page(vec![summary("a", "Hotel Sol", "Calle 1")], None)
            .push_page(vec![summary("b", "Hostal Mar", "Paseo 2")], None);

        let mut config = config(DedupScope::Sweep);
        config.delays.between_cells_ms = 10_000;
        let cancel = CancellationToken::new();
        let mut sweeper = Sweeper::new(service, config).with_cancellation(cancel.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });

        let report = sweeper.sweep(&cells(3)).await;
        assert!(report.stats.cancelled);
        assert_eq!(report.stats.cells_processed, 1);
        assert_eq!(report.records.len(), 1);
        assert_eq!(sweeper.service().search_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_does_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut sweeper =
            Sweeper::new(ScriptedService::new(), config(DedupScope::Sweep)).with_cancellation(cancel);

        let report = sweeper.sweep(&cells(2)).await;
        assert!(report.stats.cancelled);
        assert_eq!(report.stats.cells_processed, 0);
        assert!(sweeper.service().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_grid() {
        let mut sweeper = Sweeper::new(ScriptedService::new(), config(DedupScope::Sweep));
        let report = sweeper.sweep(&[]).await;
        assert!(report.records.is_empty());
        assert_eq!(report.stats, SweepStats::default());
    }
}
