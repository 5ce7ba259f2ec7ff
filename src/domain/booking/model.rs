//! Booking domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Created, awaiting payment
    Pending,
    /// Payment confirmed, awaiting check-in verification
    Paid,
    /// Verified at the front desk, awaiting physical unlock
    Verified,
    /// Guest has unlocked the room/device
    InUse,
    /// Rental finished (checkout or reconciliation sweep)
    Completed,
    /// Cancelled by user or staff
    Cancelled,
    /// Refund confirmed
    Refunded,
    /// Check-in time passed without payment or verification
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Verified => "Verified",
            Self::InUse => "InUse",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
            Self::Refunded => "Refunded",
            Self::Expired => "Expired",
        }
    }

    /// Parse a stored status string. An unrecognized value means the column
    /// is corrupted; misreading it as some real status could skip slot
    /// release, so it is an error rather than a silent default.
    pub fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Verified" => Ok(Self::Verified),
            "InUse" => Ok(Self::InUse),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            "Expired" => Ok(Self::Expired),
            other => Err(DomainError::Storage(format!(
                "unrecognized booking status {other:?}"
            ))),
        }
    }

    /// Terminal statuses have no outbound transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Cancelled | Self::Refunded | Self::Expired
        )
    }

    /// Statuses that keep the resource occupied for allocation purposes.
    ///
    /// Pending is included: a reservation must block the interval from the
    /// moment it is inserted, otherwise two concurrent reserve calls could
    /// both succeed and later both turn Paid. A Pending booking that is
    /// never paid stops blocking once the reconciliation sweep expires it
    /// past its check-in deadline.
    pub fn blocks_allocation(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Paid | Self::Verified | Self::InUse
        )
    }

    /// Statuses that hold a device slot. Pending has not charged the slot
    /// ledger yet, so only paid-and-later statuses release one.
    pub fn holds_slot(self) -> bool {
        matches!(self, Self::Paid | Self::Verified | Self::InUse)
    }

    /// Legal transition table. Anything not listed here is rejected by the
    /// state machine with `InvalidTransition`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Paid, Verified)
                | (Verified, InUse)
                // Completion is driven by checkout or by the sweep, which
                // also closes bookings that were verified but never unlocked.
                | (Verified | InUse, Completed)
                | (Paid | Verified | InUse, Cancelled)
                | (Paid | Verified | InUse, Refunded)
                // Expiry covers the never-paid case too, so a stale Pending
                // cannot block its room interval forever.
                | (Pending | Paid, Expired)
        )
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The three access codes minted for a booking at creation time.
/// Immutable once issued, each globally unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCodes {
    /// Staff-facing code presented at the front desk
    pub verification_code: String,
    /// Device-facing code authorizing physical unlock
    pub unlock_code: String,
    /// QR payload shown to the guest
    pub qr_code: String,
}

/// Rental of one time-sliced resource by one user.
///
/// Created once in `Pending` with all codes pre-generated; mutated only
/// through the booking state machine; never physically deleted (terminal
/// records are retained for audit).
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: String,
    /// Human-readable booking reference
    pub booking_no: String,
    /// Correlation id supplied by the order subsystem
    pub order_id: String,
    pub user_id: String,
    pub hotel_id: String,
    pub room_id: String,
    /// Smart locker / device bound to this stay, if any
    pub device_id: Option<String>,
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
    pub duration_hours: i32,
    /// Amount in minor currency units
    pub amount: i64,
    pub verification_code: String,
    pub unlock_code: String,
    pub qr_code: String,
    pub status: BookingStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        booking_no: impl Into<String>,
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        hotel_id: impl Into<String>,
        room_id: impl Into<String>,
        device_id: Option<String>,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        amount: i64,
        codes: AccessCodes,
    ) -> Self {
        let duration_hours =
            (check_out.signed_duration_since(check_in).num_minutes() as f64 / 60.0).ceil() as i32;
        Self {
            id: id.into(),
            booking_no: booking_no.into(),
            order_id: order_id.into(),
            user_id: user_id.into(),
            hotel_id: hotel_id.into(),
            room_id: room_id.into(),
            device_id,
            check_in,
            check_out,
            duration_hours,
            amount,
            verification_code: codes.verification_code,
            unlock_code: codes.unlock_code,
            qr_code: codes.qr_code,
            status: BookingStatus::Pending,
            verified_at: None,
            verified_by: None,
            unlocked_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Half-open interval overlap test: touching boundaries do not conflict,
    /// so a checkout at T never collides with a check-in at T.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.check_in < end && self.check_out > start
    }

    pub fn is_active(&self) -> bool {
        self.status.blocks_allocation()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_booking() -> Booking {
        let check_in = Utc::now();
        Booking::new(
            "b-1",
            "BK20260830-000001",
            "ORD-1",
            "user-1",
            "hotel-1",
            "room-101",
            None,
            check_in,
            check_in + Duration::hours(2),
            48_000,
            AccessCodes {
                verification_code: "10293847".into(),
                unlock_code: "562901".into(),
                qr_code: "ab12cd34".into(),
            },
        )
    }

    #[test]
    fn new_booking_is_pending_with_codes() {
        let b = sample_booking();
        assert_eq!(b.status, BookingStatus::Pending);
        assert_eq!(b.duration_hours, 2);
        assert_eq!(b.verification_code, "10293847");
        assert!(b.verified_at.is_none());
        assert!(b.is_active());
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Paid.can_transition_to(Verified));
        assert!(Verified.can_transition_to(InUse));
        assert!(InUse.can_transition_to(Completed));
        assert!(Verified.can_transition_to(Completed));
    }

    #[test]
    fn terminal_alternates_are_legal_from_paid_onwards() {
        use BookingStatus::*;
        for from in [Paid, Verified, InUse] {
            assert!(from.can_transition_to(Cancelled), "{from} -> Cancelled");
            assert!(from.can_transition_to(Refunded), "{from} -> Refunded");
        }
        assert!(Paid.can_transition_to(Expired));
        assert!(!Verified.can_transition_to(Expired));
        assert!(!InUse.can_transition_to(Expired));
    }

    #[test]
    fn every_unlisted_pair_is_rejected() {
        use BookingStatus::*;
        let all = [
            Pending, Paid, Verified, InUse, Completed, Cancelled, Refunded, Expired,
        ];
        let legal = [
            (Pending, Paid),
            (Paid, Verified),
            (Verified, InUse),
            (Verified, Completed),
            (InUse, Completed),
            (Paid, Cancelled),
            (Verified, Cancelled),
            (InUse, Cancelled),
            (Paid, Refunded),
            (Verified, Refunded),
            (InUse, Refunded),
            (Pending, Expired),
            (Paid, Expired),
        ];
        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_allow_nothing() {
        use BookingStatus::*;
        let all = [
            Pending, Paid, Verified, InUse, Completed, Cancelled, Refunded, Expired,
        ];
        for terminal in [Completed, Cancelled, Refunded, Expired] {
            assert!(terminal.is_terminal());
            for to in all {
                assert!(!terminal.can_transition_to(to));
            }
        }
        // Pending moves on only through payment or expiry
        for to in all {
            assert_eq!(
                BookingStatus::Pending.can_transition_to(to),
                to == Paid || to == Expired
            );
        }
    }

    #[test]
    fn overlap_is_half_open() {
        let b = sample_booking();
        // back-to-back: next check-in at this checkout does not conflict
        assert!(!b.overlaps(b.check_out, b.check_out + Duration::hours(1)));
        assert!(!b.overlaps(b.check_in - Duration::hours(1), b.check_in));
        // any true overlap conflicts
        assert!(b.overlaps(b.check_in + Duration::minutes(30), b.check_out));
        assert!(b.overlaps(b.check_in - Duration::hours(1), b.check_in + Duration::minutes(1)));
    }

    #[test]
    fn status_display_roundtrip() {
        use BookingStatus::*;
        for status in [
            Pending, Paid, Verified, InUse, Completed, Cancelled, Refunded, Expired,
        ] {
            assert_eq!(BookingStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_string_is_a_storage_error() {
        let err = BookingStatus::from_str("Garbled").unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(err.to_string().contains("Garbled"));
    }

    #[test]
    fn pending_blocks_allocation_but_holds_no_slot() {
        assert!(BookingStatus::Pending.blocks_allocation());
        assert!(!BookingStatus::Pending.holds_slot());
        assert!(BookingStatus::Paid.holds_slot());
        assert!(!BookingStatus::Expired.blocks_allocation());
    }
}
