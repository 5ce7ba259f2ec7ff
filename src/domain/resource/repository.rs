//! Resource repository interface
//!
//! Slot counters are adjusted through conditional updates: the predicate
//! encodes the invariant and the affected-row count is the success signal.
//! A `false` return is an expected business outcome (sold out), not a
//! storage failure.

use async_trait::async_trait;

use super::model::{Device, Room};
use crate::domain::DomainResult;

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn insert_room(&self, room: Room) -> DomainResult<()>;

    async fn find_room(&self, id: &str) -> DomainResult<Option<Room>>;

    async fn list_rooms_for_hotel(&self, hotel_id: &str) -> DomainResult<Vec<Room>>;

    /// Enable/disable a room for new reservations
    async fn set_room_status(
        &self,
        id: &str,
        status: super::model::ResourceStatus,
    ) -> DomainResult<()>;

    async fn insert_device(&self, device: Device) -> DomainResult<()>;

    async fn find_device(&self, id: &str) -> DomainResult<Option<Device>>;

    /// Decrement `available_slots` by `by` only where `available_slots >= by`.
    /// Single atomic statement; returns whether the decrement was applied.
    async fn try_decrement_slots(&self, device_id: &str, by: i32) -> DomainResult<bool>;

    /// Release slots. Callers are trusted to release only what they
    /// reserved, so there is no saturation guard on this side.
    async fn increment_slots(&self, device_id: &str, by: i32) -> DomainResult<()>;
}
