//! Interval allocation for time-sliced resources
//!
//! The free-check and the booking insert must be linearizable with respect
//! to other reservation attempts on the same room. Strategy: a per-room
//! exclusive async lock held across the check-and-insert, acquired under a
//! bounded timeout. For multi-process deployments the same contract can be
//! met with a uniqueness constraint + retry, or serializable isolation +
//! retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::domain::{Booking, DomainError, DomainResult, RepositoryProvider};

/// Configuration for reservation locking
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// How long a reserve call may wait for the room lock before failing
    /// fast with Conflict. No unbounded blocking on contended rooms.
    pub lock_timeout: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(2),
        }
    }
}

/// Decides whether a room is free over a window and makes winning
/// reservations visible to subsequent checks before returning.
pub struct IntervalAllocator {
    repos: Arc<dyn RepositoryProvider>,
    /// One lock per room id, created lazily
    locks: DashMap<String, Arc<Mutex<()>>>,
    config: AllocatorConfig,
}

impl IntervalAllocator {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repos,
            locks: DashMap::new(),
            config: AllocatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Reject zero-length and inverted intervals before any allocation work
    pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> DomainResult<()> {
        if end <= start {
            return Err(DomainError::Validation(format!(
                "check-out {} must be after check-in {}",
                end, start
            )));
        }
        Ok(())
    }

    /// True iff no allocation-blocking booking on the room overlaps
    /// `[start, end)`. Touching boundaries do not conflict.
    pub async fn is_free(
        &self,
        room_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Self::validate_interval(start, end)?;
        let overlapping = self.repos.bookings().find_overlapping(room_id, start, end).await?;
        Ok(overlapping.is_empty())
    }

    /// Atomically check the interval and insert the booking. The loser of a
    /// concurrent race gets `Conflict`, which the caller may retry with an
    /// alternate slot.
    pub async fn reserve(&self, booking: Booking) -> DomainResult<Booking> {
        Self::validate_interval(booking.check_in, booking.check_out)?;

        let lock = self.lock_for(&booking.room_id);
        let _guard = tokio::time::timeout(self.config.lock_timeout, lock.lock())
            .await
            .map_err(|_| {
                metrics::counter!("allocator_lock_timeouts_total").increment(1);
                DomainError::Conflict(format!(
                    "room {} is contended, try again",
                    booking.room_id
                ))
            })?;

        let overlapping = self
            .repos
            .bookings()
            .find_overlapping(&booking.room_id, booking.check_in, booking.check_out)
            .await?;
        if let Some(winner) = overlapping.first() {
            debug!(
                "Reservation conflict on room {}: booking {} holds [{}, {})",
                booking.room_id, winner.id, winner.check_in, winner.check_out
            );
            metrics::counter!("allocator_conflicts_total").increment(1);
            return Err(DomainError::Conflict(format!(
                "room {} is not available between {} and {}",
                booking.room_id, booking.check_in, booking.check_out
            )));
        }

        // Insert while still holding the room lock so the reservation is
        // visible before any competing check runs.
        self.repos.bookings().insert(booking.clone()).await?;

        info!(
            "Reserved room {} for booking {} [{}, {})",
            booking.room_id, booking.id, booking.check_in, booking.check_out
        );
        metrics::counter!("allocator_reservations_total").increment(1);
        Ok(booking)
    }

    fn lock_for(&self, room_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(room_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccessCodes;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::Duration as ChronoDuration;

    fn provider() -> Arc<dyn RepositoryProvider> {
        Arc::new(InMemoryRepositoryProvider::new())
    }

    fn booking(id: &str, room: &str, start: chrono::DateTime<Utc>, hours: i64) -> Booking {
        Booking::new(
            id,
            format!("BK-{id}"),
            format!("ORD-{id}"),
            "user-1",
            "hotel-1",
            room,
            None,
            start,
            start + ChronoDuration::hours(hours),
            50_000,
            AccessCodes {
                verification_code: format!("V{id}"),
                unlock_code: format!("U{id}"),
                qr_code: format!("Q{id}"),
            },
        )
    }

    #[tokio::test]
    async fn reserve_then_overlap_is_conflict() {
        let repos = provider();
        let allocator = IntervalAllocator::new(repos.clone());
        let start = Utc::now();

        allocator.reserve(booking("b1", "room-101", start, 2)).await.unwrap();

        let err = allocator
            .reserve(booking("b2", "room-101", start + ChronoDuration::hours(1), 2))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn back_to_back_is_accepted() {
        let repos = provider();
        let allocator = IntervalAllocator::new(repos.clone());
        let start = Utc::now();

        allocator.reserve(booking("b1", "room-101", start, 2)).await.unwrap();
        // check-in exactly at the previous checkout
        allocator
            .reserve(booking("b2", "room-101", start + ChronoDuration::hours(2), 2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn other_room_is_unaffected() {
        let repos = provider();
        let allocator = IntervalAllocator::new(repos.clone());
        let start = Utc::now();

        allocator.reserve(booking("b1", "room-101", start, 2)).await.unwrap();
        allocator.reserve(booking("b2", "room-102", start, 2)).await.unwrap();
    }

    #[tokio::test]
    async fn inverted_interval_is_rejected_before_allocation() {
        let repos = provider();
        let allocator = IntervalAllocator::new(repos.clone());
        let start = Utc::now();

        let mut b = booking("b1", "room-101", start, 2);
        b.check_out = b.check_in;
        let err = allocator.reserve(b).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(allocator.is_free("room-101", start, start + ChronoDuration::hours(1)).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_reserves_have_exactly_one_winner() {
        let repos = provider();
        let allocator = Arc::new(IntervalAllocator::new(repos.clone()));
        let start = Utc::now();

        let a1 = allocator.clone();
        let a2 = allocator.clone();
        let s = start;
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { a1.reserve(booking("b1", "room-101", s, 2)).await }),
            tokio::spawn(async move { a2.reserve(booking("b2", "room-101", s, 2)).await }),
        );
        let outcomes = [r1.unwrap(), r2.unwrap()];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        let conflicts = outcomes
            .iter()
            .filter(|r| matches!(r, Err(DomainError::Conflict(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
    }

    #[tokio::test]
    async fn is_free_reflects_reservations() {
        let repos = provider();
        let allocator = IntervalAllocator::new(repos.clone());
        let start = Utc::now();

        assert!(allocator
            .is_free("room-101", start, start + ChronoDuration::hours(2))
            .await
            .unwrap());
        allocator.reserve(booking("b1", "room-101", start, 2)).await.unwrap();
        assert!(!allocator
            .is_free("room-101", start, start + ChronoDuration::hours(2))
            .await
            .unwrap());
        assert!(allocator
            .is_free(
                "room-101",
                start + ChronoDuration::hours(2),
                start + ChronoDuration::hours(4)
            )
            .await
            .unwrap());
    }
}
