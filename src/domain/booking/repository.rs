//! Booking repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Booking, BookingStatus};
use crate::domain::DomainResult;

/// Field changes applied together with a guarded status update.
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persist a new booking (status Pending, codes already minted)
    async fn insert(&self, booking: Booking) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>>;

    /// Payment callbacks correlate by order id
    async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Option<Booking>>;

    async fn find_by_verification_code(&self, code: &str) -> DomainResult<Option<Booking>>;

    async fn find_by_unlock_code(&self, code: &str) -> DomainResult<Option<Booking>>;

    /// True if the code collides with any verification/unlock/qr code of any
    /// booking, active or historical. Used by the issuer's collision retry.
    async fn code_in_use(&self, code: &str) -> DomainResult<bool>;

    /// Bookings on the room whose status blocks allocation and whose
    /// half-open interval overlaps `[start, end)`.
    async fn find_overlapping(
        &self,
        room_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>>;

    /// All allocation-blocking bookings for a room, newest first
    async fn find_active_for_room(&self, room_id: &str) -> DomainResult<Vec<Booking>>;

    async fn find_for_user(&self, user_id: &str) -> DomainResult<Vec<Booking>>;

    /// Guarded conditional status update: applies `to` plus the patch only
    /// while the stored status is still one of `from`. Returns whether
    /// exactly one row changed; `false` means the guard failed (the booking
    /// moved on concurrently) and must not be treated as success.
    async fn apply_transition(
        &self,
        id: &str,
        from: &[BookingStatus],
        to: BookingStatus,
        patch: TransitionPatch,
    ) -> DomainResult<bool>;

    /// Pending/Paid bookings whose check-in deadline passed without payment
    /// or verification, bounded batch for the reconciliation sweep.
    async fn find_expirable(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<Booking>>;

    /// Verified/InUse bookings whose checkout deadline passed,
    /// bounded batch for the reconciliation sweep.
    async fn find_completable(&self, now: DateTime<Utc>, limit: u64)
        -> DomainResult<Vec<Booking>>;
}
