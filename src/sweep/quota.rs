//! Request quota governor.
//!
//! Every remote request passes through [`QuotaGovernor::acquire`] first.
//! The governor counts requests and suspends the sweep when a per-minute
//! multiple is crossed (cooldown) or the per-day limit is reached (sleep
//! until the next UTC midnight, then reset). The counter also resets
//! whenever the UTC calendar day changes.

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{pause, Cancelled};
use crate::config::QuotaConfig;

/// Wall-clock source for the day boundary
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaState {
    Running,
    Throttled,
    DayExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaPolicy {
    pub per_minute: Option<NonZeroU64>,
    pub per_day: Option<NonZeroU64>,
    pub cooldown: Duration,
}

impl QuotaPolicy {
    pub fn unlimited() -> Self {
        Self {
            per_minute: None,
            per_day: None,
            cooldown: Duration::ZERO,
        }
    }
}

impl From<&QuotaConfig> for QuotaPolicy {
    fn from(config: &QuotaConfig) -> Self {
        Self {
            per_minute: NonZeroU64::new(u64::from(config.per_minute)),
            per_day: NonZeroU64::new(u64::from(config.per_day)),
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

pub struct QuotaGovernor {
    policy: QuotaPolicy,
    clock: Arc<dyn Clock>,
    state: QuotaState,
    /// UTC date the counter belongs to
    day: NaiveDate,
    /// Requests since the last day reset
    count: u64,
    /// Requests over the whole run
    total: u64,
    throttles: u64,
    day_waits: u64,
}

impl QuotaGovernor {
    pub fn new(policy: QuotaPolicy, clock: Arc<dyn Clock>) -> Self {
        let day = clock.now().date_naive();
        Self {
            policy,
            clock,
            state: QuotaState::Running,
            day,
            count: 0,
            total: 0,
            throttles: 0,
            day_waits: 0,
        }
    }

    /// Wait until one more request is allowed, then count it.
    ///
    /// Returns `Err(Cancelled)` without counting if the token fires while
    /// suspended.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        self.roll_day();

        if let Some(per_day) = self.policy.per_day {
            if self.count >= per_day.get() {
                let wait = until_next_day(self.clock.now());
                warn!(
                    "Daily limit of {} requests reached, pausing {:?} until the next day",
                    per_day, wait
                );
                self.state = QuotaState::DayExhausted;
                self.day_waits += 1;
                pause(wait, cancel).await?;
                self.count = 0;
                self.day = self.clock.now().date_naive();
                self.state = QuotaState::Running;
                info!("New quota day, resuming");
            }
        }

        if let Some(per_minute) = self.policy.per_minute {
            if self.count > 0 && self.count % per_minute.get() == 0 {
                warn!(
                    "{} requests issued, cooling down for {:?}",
                    self.count, self.policy.cooldown
                );
                self.state = QuotaState::Throttled;
                self.throttles += 1;
                pause(self.policy.cooldown, cancel).await?;
                self.state = QuotaState::Running;
            }
        }

        self.count += 1;
        self.total += 1;
        Ok(())
    }

    fn roll_day(&mut self) {
        let today = self.clock.now().date_naive();
        if today > self.day {
            if self.count > 0 {
                info!("New quota day {}, resetting count of {}", today, self.count);
            }
            self.day = today;
            self.count = 0;
        }
    }

    pub fn state(&self) -> QuotaState {
        self.state
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn throttles(&self) -> u64 {
        self.throttles
    }

    pub fn day_waits(&self) -> u64 {
        self.day_waits
    }
}

/// Time left until the next UTC midnight
pub fn until_next_day(now: DateTime<Utc>) -> Duration {
    now.date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight.and_utc() - now).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct SettableClock(Mutex<DateTime<Utc>>);

    impl SettableClock {
        fn set(&self, now: DateTime<Utc>) {
            *self.0.lock().unwrap() = now;
        }
    }

    impl Clock for SettableClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn policy(per_minute: u64, per_day: u64) -> QuotaPolicy {
        QuotaPolicy {
            per_minute: NonZeroU64::new(per_minute),
            per_day: NonZeroU64::new(per_day),
            cooldown: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_until_next_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 30).unwrap();
        assert_eq!(until_next_day(now), Duration::from_secs(30));

        let midnight = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(until_next_day(midnight), Duration::from_secs(86_400));
    }

    #[test]
    fn test_policy_from_config() {
        let config = QuotaConfig {
            per_minute: 0,
            per_day: 100,
            cooldown_secs: 5,
        };
        let policy = QuotaPolicy::from(&config);
        assert_eq!(policy.per_minute, None);
        assert_eq!(policy.per_day, NonZeroU64::new(100));
        assert_eq!(policy.cooldown, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_after_per_minute_threshold() {
        let mut governor = QuotaGovernor::new(policy(3, 0), Arc::new(SystemClock));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        for _ in 0..3 {
            governor.acquire(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        governor.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(governor.throttles(), 1);
        assert_eq!(governor.state(), QuotaState::Running);

        // Next cooldown only after another full window
        let mid = Instant::now();
        governor.acquire(&cancel).await.unwrap();
        governor.acquire(&cancel).await.unwrap();
        assert_eq!(mid.elapsed(), Duration::ZERO);
        governor.acquire(&cancel).await.unwrap();
        assert!(mid.elapsed() >= Duration::from_secs(60));
        assert_eq!(governor.throttles(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_day_exhaustion_sleeps_until_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 23, 0, 0).unwrap();
        let mut governor = QuotaGovernor::new(policy(0, 2), Arc::new(FixedClock(now)));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        governor.acquire(&cancel).await.unwrap();
        governor.acquire(&cancel).await.unwrap();
        assert_eq!(governor.count(), 2);

        governor.acquire(&cancel).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3600));
        assert_eq!(governor.count(), 1);
        assert_eq!(governor.total(), 3);
        assert_eq!(governor.day_waits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_never_waits() {
        let mut governor = QuotaGovernor::new(QuotaPolicy::unlimited(), Arc::new(SystemClock));
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..1000 {
            governor.acquire(&cancel).await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(governor.total(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_cooldown() {
        let mut governor = QuotaGovernor::new(policy(1, 0), Arc::new(SystemClock));
        let cancel = CancellationToken::new();
        governor.acquire(&cancel).await.unwrap();

        cancel.cancel();
        assert_eq!(governor.acquire(&cancel).await, Err(Cancelled));
        assert_eq!(governor.total(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_resets_on_new_calendar_day() {
        let clock = Arc::new(SettableClock(Mutex::new(
            Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
        )));
        let mut governor = QuotaGovernor::new(policy(0, 3), clock.clone());
        let cancel = CancellationToken::new();

        governor.acquire(&cancel).await.unwrap();
        governor.acquire(&cancel).await.unwrap();
        assert_eq!(governor.count(), 2);

        clock.set(Utc.with_ymd_and_hms(2026, 3, 15, 10, 0, 0).unwrap());
        let start = Instant::now();
        governor.acquire(&cancel).await.unwrap();
        governor.acquire(&cancel).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(governor.count(), 2);
        assert_eq!(governor.total(), 4);
        assert_eq!(governor.day_waits(), 0);
    }
}
