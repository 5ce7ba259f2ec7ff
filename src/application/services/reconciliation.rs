//! Reconciliation sweep
//!
//! Periodic background task forcing terminal transitions for bookings whose
//! wall-clock deadline passed without an external event: Pending/Paid past
//! check-in -> Expired, Verified/InUse past checkout -> Completed.
//!
//! Every per-booking transition is a guarded conditional update, so the
//! sweep is idempotent and safe to run from multiple workers under
//! at-least-once scheduling. One failing booking never aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::services::BookingService;
use crate::domain::{DomainResult, RepositoryProvider};
use crate::support::retry::{retry_with_backoff, RetryConfig};
use crate::support::shutdown::ShutdownSignal;

/// Configuration for the reconciliation sweep
#[derive(Debug, Clone)]
pub struct ReconciliationConfig {
    /// How often to sweep (in seconds)
    pub sweep_interval_secs: u64,
    /// Max bookings per category per sweep; keeps individual sweeps short
    pub batch_size: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 60,
            batch_size: 100,
        }
    }
}

/// What one sweep pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub expired: u64,
    pub completed: u64,
    /// Guard lost to a concurrent mutator; harmless, counted for visibility
    pub skipped: u64,
    pub failed: u64,
}

pub struct ReconciliationScheduler {
    repos: Arc<dyn RepositoryProvider>,
    bookings: Arc<BookingService>,
    config: ReconciliationConfig,
    running: Arc<RwLock<bool>>,
}

impl ReconciliationScheduler {
    pub fn new(repos: Arc<dyn RepositoryProvider>, bookings: Arc<BookingService>) -> Self {
        Self {
            repos,
            bookings,
            config: ReconciliationConfig::default(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_config(mut self, config: ReconciliationConfig) -> Self {
        self.config = config;
        self
    }

    /// Start the background sweep task
    pub fn start(self: &Arc<Self>, shutdown: ShutdownSignal) {
        let scheduler = self.clone();
        let running = self.running.clone();

        tokio::spawn(async move {
            {
                let mut r = running.write().await;
                *r = true;
            }

            info!(
                "Reconciliation sweep started (interval: {}s, batch: {})",
                scheduler.config.sweep_interval_secs, scheduler.config.batch_size
            );

            let mut interval =
                tokio::time::interval(Duration::from_secs(scheduler.config.sweep_interval_secs));

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match scheduler.sweep_once().await {
                            Ok(outcome) => {
                                if outcome != SweepOutcome::default() {
                                    info!(
                                        expired = outcome.expired,
                                        completed = outcome.completed,
                                        skipped = outcome.skipped,
                                        failed = outcome.failed,
                                        "Sweep finished"
                                    );
                                }
                            }
                            Err(e) => warn!("Sweep error: {}", e),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("Reconciliation sweep shutting down");
                        break;
                    }
                }
            }

            {
                let mut r = running.write().await;
                *r = false;
            }

            info!("Reconciliation sweep stopped");
        });
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// One full sweep pass. Public so ops tooling and tests can drive it
    /// directly.
    pub async fn sweep_once(&self) -> DomainResult<SweepOutcome> {
        let now = Utc::now();
        let mut outcome = SweepOutcome::default();

        let expirable = self
            .repos
            .bookings()
            .find_expirable(now, self.config.batch_size)
            .await?;
        debug!("Sweep: {} bookings past check-in", expirable.len());
        for booking in &expirable {
            let attempt = retry_with_backoff(
                RetryConfig::default(),
                || self.bookings.try_expire(booking),
                |e| e.is_transient(),
                "expire_booking",
            )
            .await;
            match attempt {
                Ok(true) => {
                    outcome.expired += 1;
                    metrics::counter!("sweep_bookings_expired_total").increment(1);
                }
                Ok(false) => outcome.skipped += 1,
                Err(e) if e.is_business_outcome() => {
                    debug!("Skipping expiry of booking {}: {}", booking.id, e);
                    outcome.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to expire booking {}: {}", booking.id, e);
                    outcome.failed += 1;
                }
            }
        }

        let completable = self
            .repos
            .bookings()
            .find_completable(now, self.config.batch_size)
            .await?;
        debug!("Sweep: {} bookings past checkout", completable.len());
        for booking in &completable {
            let attempt = retry_with_backoff(
                RetryConfig::default(),
                || self.bookings.try_complete_overdue(booking),
                |e| e.is_transient(),
                "complete_booking",
            )
            .await;
            match attempt {
                Ok(true) => {
                    outcome.completed += 1;
                    metrics::counter!("sweep_bookings_completed_total").increment(1);
                }
                Ok(false) => outcome.skipped += 1,
                Err(e) if e.is_business_outcome() => {
                    debug!("Skipping completion of booking {}: {}", booking.id, e);
                    outcome.skipped += 1;
                }
                Err(e) => {
                    warn!("Failed to complete booking {}: {}", booking.id, e);
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{CodeIssuer, IntervalAllocator, NewBookingRequest};
    use crate::domain::{BookingStatus, Device, Room};
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::Duration as ChronoDuration;

    struct Fixture {
        repos: Arc<dyn RepositoryProvider>,
        bookings: Arc<BookingService>,
        scheduler: ReconciliationScheduler,
    }

    async fn fixture() -> Fixture {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        repos
            .resources()
            .insert_room(Room::new("room-101", "hotel-1", "101"))
            .await
            .unwrap();
        repos
            .resources()
            .insert_device(Device::new("dev-1", "hotel-1", "Lockers", 4))
            .await
            .unwrap();
        let allocator = Arc::new(IntervalAllocator::new(repos.clone()));
        let codes = Arc::new(CodeIssuer::new(repos.clone()));
        let bookings = Arc::new(BookingService::new(repos.clone(), allocator, codes));
        let scheduler = ReconciliationScheduler::new(repos.clone(), bookings.clone());
        Fixture {
            repos,
            bookings,
            scheduler,
        }
    }

    /// Booking whose check-in is in the past, paid
    async fn paid_booking_in_past(f: &Fixture, order: &str, hours_ago: i64) -> String {
        let check_in = Utc::now() - ChronoDuration::hours(hours_ago);
        let booking = f
            .bookings
            .create(NewBookingRequest {
                order_id: order.to_string(),
                user_id: "user-1".into(),
                hotel_id: "hotel-1".into(),
                room_id: "room-101".into(),
                device_id: Some("dev-1".into()),
                check_in,
                check_out: check_in + ChronoDuration::hours(2),
                amount: 48_000,
            })
            .await
            .unwrap();
        f.bookings.mark_paid(order).await.unwrap();
        booking.id
    }

    async fn status_of(f: &Fixture, id: &str) -> BookingStatus {
        f.repos.bookings().find_by_id(id).await.unwrap().unwrap().status
    }

    async fn slots(f: &Fixture) -> i32 {
        f.repos
            .resources()
            .find_device("dev-1")
            .await
            .unwrap()
            .unwrap()
            .available_slots
    }

    #[tokio::test]
    async fn sweep_expires_paid_bookings_past_check_in() {
        let f = fixture().await;
        let id = paid_booking_in_past(&f, "ORD-1", 3).await;
        assert_eq!(slots(&f).await, 3);

        let outcome = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(outcome.expired, 1);
        assert_eq!(outcome.failed, 0);
        assert_eq!(status_of(&f, &id).await, BookingStatus::Expired);
        // slot released
        assert_eq!(slots(&f).await, 4);
    }

    #[tokio::test]
    async fn sweep_expires_stale_pending_and_frees_the_room() {
        let f = fixture().await;
        let check_in = Utc::now() - ChronoDuration::hours(12);
        let req = |order: &str| NewBookingRequest {
            order_id: order.to_string(),
            user_id: "user-1".into(),
            hotel_id: "hotel-1".into(),
            room_id: "room-101".into(),
            device_id: None,
            check_in,
            check_out: check_in + ChronoDuration::hours(2),
            amount: 48_000,
        };

        // Never paid: cancel is not available for Pending, so without the
        // sweep this booking would block the interval indefinitely.
        let stale = f.bookings.create(req("ORD-1")).await.unwrap();
        assert!(f.bookings.create(req("ORD-2")).await.is_err());

        let outcome = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(outcome.expired, 1);
        assert_eq!(status_of(&f, &stale.id).await, BookingStatus::Expired);
        // Pending never charged a device slot, so none is released
        assert_eq!(slots(&f).await, 4);

        // the interval is bookable again
        f.bookings.create(req("ORD-2")).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_completes_overdue_rentals() {
        let f = fixture().await;
        let id = paid_booking_in_past(&f, "ORD-1", 3).await;
        let b = f.repos.bookings().find_by_id(&id).await.unwrap().unwrap();
        f.bookings.verify(&b.verification_code, "staff123").await.unwrap();
        f.bookings.unlock(&b.unlock_code, "room-101").await.unwrap();

        // checkout was an hour ago
        let outcome = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(outcome.completed, 1);
        assert_eq!(outcome.expired, 0);

        let done = f.repos.bookings().find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(done.status, BookingStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(slots(&f).await, 4);
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let f = fixture().await;
        paid_booking_in_past(&f, "ORD-1", 3).await;

        let first = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(first.expired, 1);

        let second = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(second, SweepOutcome::default());
        // no double slot release
        assert_eq!(slots(&f).await, 4);
    }

    #[tokio::test]
    async fn future_bookings_are_left_alone() {
        let f = fixture().await;
        let check_in = Utc::now() + ChronoDuration::hours(5);
        f.bookings
            .create(NewBookingRequest {
                order_id: "ORD-1".into(),
                user_id: "user-1".into(),
                hotel_id: "hotel-1".into(),
                room_id: "room-101".into(),
                device_id: None,
                check_in,
                check_out: check_in + ChronoDuration::hours(2),
                amount: 48_000,
            })
            .await
            .unwrap();
        f.bookings.mark_paid("ORD-1").await.unwrap();

        let outcome = f.scheduler.sweep_once().await.unwrap();
        assert_eq!(outcome, SweepOutcome::default());
    }

    #[tokio::test]
    async fn batch_size_bounds_one_sweep() {
        let f = fixture().await;
        let scheduler = ReconciliationScheduler::new(f.repos.clone(), f.bookings.clone())
            .with_config(ReconciliationConfig {
                sweep_interval_secs: 60,
                batch_size: 1,
            });

        // two stale bookings on different intervals
        paid_booking_in_past(&f, "ORD-1", 10).await;
        paid_booking_in_past(&f, "ORD-2", 6).await;

        let first = scheduler.sweep_once().await.unwrap();
        assert_eq!(first.expired, 1);
        let second = scheduler.sweep_once().await.unwrap();
        assert_eq!(second.expired, 1);
    }

    #[tokio::test]
    async fn concurrent_sweeps_release_each_slot_once() {
        let f = fixture().await;
        paid_booking_in_past(&f, "ORD-1", 3).await;

        let s1 = Arc::new(ReconciliationScheduler::new(f.repos.clone(), f.bookings.clone()));
        let s2 = Arc::new(ReconciliationScheduler::new(f.repos.clone(), f.bookings.clone()));
        let (a, b) = tokio::join!(
            { let s = s1.clone(); async move { s.sweep_once().await } },
            { let s = s2.clone(); async move { s.sweep_once().await } },
        );
        let total = a.unwrap().expired + b.unwrap().expired;
        assert_eq!(total, 1);
        assert_eq!(slots(&f).await, 4);
    }

    #[tokio::test]
    async fn start_and_shutdown_flip_running() {
        let f = fixture().await;
        let scheduler = Arc::new(ReconciliationScheduler::new(
            f.repos.clone(),
            f.bookings.clone(),
        ));
        let shutdown = ShutdownSignal::new();

        scheduler.start(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_running().await);

        shutdown.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scheduler.is_running().await);
    }
}
