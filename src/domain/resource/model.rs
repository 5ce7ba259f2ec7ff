//! Allocatable resources: rooms (time-sliced) and devices (slot-counted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a resource accepts new reservations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceStatus {
    Active,
    Disabled,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Disabled => "Disabled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Active" => Self::Active,
            _ => Self::Disabled,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A time-sliced resource. Occupancy is never stored: it is derived by
/// querying active bookings overlapping a window.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub hotel_id: String,
    pub room_no: String,
    pub status: ResourceStatus,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(
        id: impl Into<String>,
        hotel_id: impl Into<String>,
        room_no: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            hotel_id: hotel_id.into(),
            room_no: room_no.into(),
            status: ResourceStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ResourceStatus::Active
    }
}

/// A counter-sliced resource (smart locker cabinet, shared device bank).
/// Invariant: `0 <= available_slots <= total_slots`.
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub hotel_id: String,
    pub name: String,
    pub total_slots: i32,
    pub available_slots: i32,
    pub status: ResourceStatus,
    pub created_at: DateTime<Utc>,
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        hotel_id: impl Into<String>,
        name: impl Into<String>,
        total_slots: i32,
    ) -> Self {
        Self {
            id: id.into(),
            hotel_id: hotel_id.into(),
            name: name.into(),
            total_slots,
            available_slots: total_slots,
            status: ResourceStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ResourceStatus::Active
    }

    pub fn is_sold_out(&self) -> bool {
        self.available_slots == 0
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_device_starts_full() {
        let d = Device::new("dev-1", "hotel-1", "Lobby lockers", 8);
        assert_eq!(d.available_slots, 8);
        assert!(d.is_active());
        assert!(!d.is_sold_out());
    }

    #[test]
    fn room_status_roundtrip() {
        assert_eq!(ResourceStatus::from_str("Active"), ResourceStatus::Active);
        assert_eq!(
            ResourceStatus::from_str(ResourceStatus::Disabled.as_str()),
            ResourceStatus::Disabled
        );
    }
}
