//! Booking lifecycle state machine
//!
//! Owns every Booking mutation. All status writes go through guarded
//! conditional updates (`WHERE status IN (sources)`), so racing mutators,
//! payment callbacks and the reconciliation sweep stay safe under
//! at-least-once delivery. Slot releases ride on the guard: only the caller
//! whose update actually applied performs the release, making it
//! exactly-once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use uuid::Uuid;

use crate::application::services::{CodeIssuer, IntervalAllocator};
use crate::domain::{
    Booking, BookingStatus, DomainError, DomainResult, RepositoryProvider, ResourceStatus,
    TransitionPatch,
};

/// Reservation request as received from the order subsystem
#[derive(Debug, Clone)]
pub struct NewBookingRequest {
    pub order_id: String,
    pub user_id: String,
    pub hotel_id: String,
    pub room_id: String,
    pub device_id: Option<String>,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    /// Amount in minor currency units
    pub amount: i64,
}

pub struct BookingService {
    repos: Arc<dyn RepositoryProvider>,
    allocator: Arc<IntervalAllocator>,
    codes: Arc<CodeIssuer>,
}

impl BookingService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        allocator: Arc<IntervalAllocator>,
        codes: Arc<CodeIssuer>,
    ) -> Self {
        Self {
            repos,
            allocator,
            codes,
        }
    }

    /// Create a booking: validate the resources, mint the access codes and
    /// reserve the interval atomically. The new booking starts Pending.
    pub async fn create(&self, req: NewBookingRequest) -> DomainResult<Booking> {
        IntervalAllocator::validate_interval(req.check_in, req.check_out)?;

        let room = self
            .repos
            .resources()
            .find_room(&req.room_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Room",
                field: "id",
                value: req.room_id.clone(),
            })?;
        if room.status != ResourceStatus::Active {
            return Err(DomainError::Validation(format!(
                "room {} is disabled",
                room.id
            )));
        }

        if let Some(device_id) = &req.device_id {
            let device = self
                .repos
                .resources()
                .find_device(device_id)
                .await?
                .ok_or(DomainError::NotFound {
                    entity: "Device",
                    field: "id",
                    value: device_id.clone(),
                })?;
            if device.status != ResourceStatus::Active {
                return Err(DomainError::Validation(format!(
                    "device {} is disabled",
                    device.id
                )));
            }
        }

        let id = Uuid::new_v4().to_string();
        let codes = self.codes.issue_codes(&id).await?;
        let booking = Booking::new(
            id,
            self.codes.next_booking_no(),
            req.order_id,
            req.user_id,
            req.hotel_id,
            req.room_id,
            req.device_id,
            req.check_in,
            req.check_out,
            req.amount,
            codes,
        );

        let booking = self.allocator.reserve(booking).await?;
        info!(
            "Booking {} created: room={}, [{}, {})",
            booking.booking_no, booking.room_id, booking.check_in, booking.check_out
        );
        Ok(booking)
    }

    /// Payment-success callback from the payment subsystem, correlated by
    /// order id. Charges the device slot before committing Paid; a lost
    /// guard rolls the slot back.
    pub async fn mark_paid(&self, order_id: &str) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_order_id(order_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Booking",
                field: "order_id",
                value: order_id.to_string(),
            })?;

        if !booking.status.can_transition_to(BookingStatus::Paid) {
            return Err(DomainError::InvalidTransition {
                current: booking.status.to_string(),
                requested: "mark_paid",
            });
        }

        if let Some(device_id) = &booking.device_id {
            let charged = self
                .repos
                .resources()
                .try_decrement_slots(device_id, 1)
                .await?;
            if !charged {
                return Err(DomainError::InsufficientCapacity {
                    resource: device_id.clone(),
                });
            }
        }

        let applied = self
            .repos
            .bookings()
            .apply_transition(
                &booking.id,
                &[BookingStatus::Pending],
                BookingStatus::Paid,
                TransitionPatch::default(),
            )
            .await?;
        if !applied {
            // Guard lost: hand the slot back before reporting the race.
            if let Some(device_id) = &booking.device_id {
                self.repos.resources().increment_slots(device_id, 1).await?;
            }
            return Err(DomainError::Conflict(format!(
                "booking {} changed concurrently",
                booking.id
            )));
        }

        info!("Booking {} paid (order {})", booking.booking_no, order_id);
        self.reload(&booking.id).await
    }

    /// Front-desk verification: staff resolves the verification code and the
    /// booking moves Paid -> Verified.
    pub async fn verify(&self, verification_code: &str, staff_id: &str) -> DomainResult<Booking> {
        let booking = self.codes.resolve_by_verification_code(verification_code).await?;

        if !booking.status.can_transition_to(BookingStatus::Verified) {
            return Err(DomainError::InvalidTransition {
                current: booking.status.to_string(),
                requested: "verify",
            });
        }

        let patch = TransitionPatch {
            verified_at: Some(Utc::now()),
            verified_by: Some(staff_id.to_string()),
            ..Default::default()
        };
        let applied = self
            .repos
            .bookings()
            .apply_transition(&booking.id, &[BookingStatus::Paid], BookingStatus::Verified, patch)
            .await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "booking {} changed concurrently",
                booking.id
            )));
        }

        info!(
            "Booking {} verified by {}",
            booking.booking_no, staff_id
        );
        self.reload(&booking.id).await
    }

    /// Device gateway unlock: resolves the unlock code for the resource and
    /// moves Verified -> InUse. A booking already InUse is returned as-is so
    /// device retries of the unlock command succeed idempotently.
    pub async fn unlock(&self, unlock_code: &str, resource_id: &str) -> DomainResult<Booking> {
        let booking = self.codes.resolve_by_unlock_code(unlock_code, resource_id).await?;

        if booking.status == BookingStatus::InUse {
            return Ok(booking);
        }

        let patch = TransitionPatch {
            unlocked_at: Some(Utc::now()),
            ..Default::default()
        };
        let applied = self
            .repos
            .bookings()
            .apply_transition(&booking.id, &[BookingStatus::Verified], BookingStatus::InUse, patch)
            .await?;
        if !applied {
            // Another unlock attempt may have won the race; that still
            // counts as an open door.
            let current = self.reload(&booking.id).await?;
            if current.status == BookingStatus::InUse {
                return Ok(current);
            }
            return Err(DomainError::Conflict(format!(
                "booking {} changed concurrently",
                booking.id
            )));
        }

        info!("Booking {} unlocked on {}", booking.booking_no, resource_id);
        self.reload(&booking.id).await
    }

    /// Checkout event. Verified is accepted as a source too: a guest who
    /// verified but never unlocked still checks out.
    pub async fn complete(&self, booking_id: &str) -> DomainResult<Booking> {
        self.finish(
            booking_id,
            &[BookingStatus::Verified, BookingStatus::InUse],
            BookingStatus::Completed,
            "complete",
        )
        .await
    }

    /// User/staff cancellation of a paid booking
    pub async fn cancel(&self, booking_id: &str) -> DomainResult<Booking> {
        self.finish(
            booking_id,
            &[BookingStatus::Paid, BookingStatus::Verified, BookingStatus::InUse],
            BookingStatus::Cancelled,
            "cancel",
        )
        .await
    }

    /// Refund confirmation from the order/refund subsystem
    pub async fn refund(&self, booking_id: &str) -> DomainResult<Booking> {
        self.finish(
            booking_id,
            &[BookingStatus::Paid, BookingStatus::Verified, BookingStatus::InUse],
            BookingStatus::Refunded,
            "refund",
        )
        .await
    }

    /// Guarded expiry used by the reconciliation sweep: Pending/Paid ->
    /// Expired once check-in passed. Covers never-paid bookings too, so a
    /// stale Pending cannot block its room interval forever. Returns whether
    /// this caller applied the transition (and released any slot held).
    pub async fn try_expire(&self, booking: &Booking) -> DomainResult<bool> {
        let applied = self
            .repos
            .bookings()
            .apply_transition(
                &booking.id,
                &[BookingStatus::Pending, BookingStatus::Paid],
                BookingStatus::Expired,
                TransitionPatch::default(),
            )
            .await?;
        if applied {
            self.release_slot(booking).await?;
            info!("Booking {} expired (check-in passed)", booking.booking_no);
        }
        Ok(applied)
    }

    /// Guarded auto-completion used by the reconciliation sweep:
    /// Verified/InUse -> Completed once the checkout deadline lapsed.
    pub async fn try_complete_overdue(&self, booking: &Booking) -> DomainResult<bool> {
        let patch = TransitionPatch {
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        let applied = self
            .repos
            .bookings()
            .apply_transition(
                &booking.id,
                &[BookingStatus::Verified, BookingStatus::InUse],
                BookingStatus::Completed,
                patch,
            )
            .await?;
        if applied {
            self.release_slot(booking).await?;
            info!("Booking {} auto-completed", booking.booking_no);
        }
        Ok(applied)
    }

    pub async fn get(&self, booking_id: &str) -> DomainResult<Option<Booking>> {
        self.repos.bookings().find_by_id(booking_id).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_for_user(user_id).await
    }

    pub async fn list_active_for_room(&self, room_id: &str) -> DomainResult<Vec<Booking>> {
        self.repos.bookings().find_active_for_room(room_id).await
    }

    // ── Internals ──────────────────────────────────────────────

    /// Shared terminal-transition path: legality check, guarded update,
    /// slot release when the source state held one.
    async fn finish(
        &self,
        booking_id: &str,
        from: &[BookingStatus],
        to: BookingStatus,
        requested: &'static str,
    ) -> DomainResult<Booking> {
        let booking = self
            .repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Booking",
                field: "id",
                value: booking_id.to_string(),
            })?;

        if !booking.status.can_transition_to(to) || !from.contains(&booking.status) {
            return Err(DomainError::InvalidTransition {
                current: booking.status.to_string(),
                requested,
            });
        }

        let patch = if to == BookingStatus::Completed {
            TransitionPatch {
                completed_at: Some(Utc::now()),
                ..Default::default()
            }
        } else {
            TransitionPatch::default()
        };

        let applied = self
            .repos
            .bookings()
            .apply_transition(&booking.id, from, to, patch)
            .await?;
        if !applied {
            return Err(DomainError::Conflict(format!(
                "booking {} changed concurrently",
                booking.id
            )));
        }

        self.release_slot(&booking).await?;
        info!("Booking {} -> {}", booking.booking_no, to);
        self.reload(&booking.id).await
    }

    /// Release the device slot a booking held. Only called after winning a
    /// guarded transition out of a slot-holding state.
    async fn release_slot(&self, booking: &Booking) -> DomainResult<()> {
        if !booking.status.holds_slot() {
            return Ok(());
        }
        if let Some(device_id) = &booking.device_id {
            self.repos.resources().increment_slots(device_id, 1).await?;
        }
        Ok(())
    }

    async fn reload(&self, booking_id: &str) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| {
                warn!("Booking {} vanished after update", booking_id);
                DomainError::NotFound {
                    entity: "Booking",
                    field: "id",
                    value: booking_id.to_string(),
                }
            })
    }
}

// ── Tests ──────────────────────────────────────────────────────
