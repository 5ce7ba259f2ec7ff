//! In-memory repository provider for development and testing
//!
//! Conditional counter updates rely on `DashMap::get_mut`, which holds the
//! shard lock for the duration of the check-and-mutate, giving the same
//! atomicity the SeaORM provider gets from single-statement conditional
//! updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{
    Booking, BookingRepository, BookingStatus, CommissionAccount, CommissionRepository,
    CouponLedger, CouponRepository, Device, DomainError, DomainResult, RepositoryProvider,
    ResourceRepository, ResourceStatus, Room, TransitionPatch,
};

#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    bookings: DashMap<String, Booking>,
    rooms: DashMap<String, Room>,
    devices: DashMap<String, Device>,
    accounts: DashMap<String, CommissionAccount>,
    coupons: DashMap<String, CouponLedger>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn bookings(&self) -> &dyn BookingRepository {
        self
    }

    fn resources(&self) -> &dyn ResourceRepository {
        self
    }

    fn commissions(&self) -> &dyn CommissionRepository {
        self
    }

    fn coupons(&self) -> &dyn CouponRepository {
        self
    }
}

// ── BookingRepository ───────────────────────────────────────────

#[async_trait]
impl BookingRepository for InMemoryRepositoryProvider {
    async fn insert(&self, booking: Booking) -> DomainResult<()> {
        if self.bookings.contains_key(&booking.id) {
            return Err(DomainError::Conflict(format!(
                "booking {} already exists",
                booking.id
            )));
        }
        self.bookings.insert(booking.id.clone(), booking);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(id).map(|b| b.clone()))
    }

    async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| b.order_id == order_id)
            .map(|b| b.clone()))
    }

    async fn find_by_verification_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| b.verification_code == code)
            .map(|b| b.clone()))
    }

    async fn find_by_unlock_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        Ok(self
            .bookings
            .iter()
            .find(|b| b.unlock_code == code)
            .map(|b| b.clone()))
    }

    async fn code_in_use(&self, code: &str) -> DomainResult<bool> {
        Ok(self.bookings.iter().any(|b| {
            b.verification_code == code || b.unlock_code == code || b.qr_code == code
        }))
    }

    async fn find_overlapping(
        &self,
        room_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                b.room_id == room_id && b.status.blocks_allocation() && b.overlaps(start, end)
            })
            .map(|b| b.clone())
            .collect())
    }

    async fn find_active_for_room(&self, room_id: &str) -> DomainResult<Vec<Booking>> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.room_id == room_id && b.status.blocks_allocation())
            .map(|b| b.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find_for_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        let mut out: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn apply_transition(
        &self,
        id: &str,
        from: &[BookingStatus],
        to: BookingStatus,
        patch: TransitionPatch,
    ) -> DomainResult<bool> {
        let Some(mut booking) = self.bookings.get_mut(id) else {
            return Ok(false);
        };
        if !from.contains(&booking.status) {
            return Ok(false);
        }
        booking.status = to;
        if patch.verified_at.is_some() {
            booking.verified_at = patch.verified_at;
        }
        if patch.verified_by.is_some() {
            booking.verified_by = patch.verified_by;
        }
        if patch.unlocked_at.is_some() {
            booking.unlocked_at = patch.unlocked_at;
        }
        if patch.completed_at.is_some() {
            booking.completed_at = patch.completed_at;
        }
        Ok(true)
    }

    async fn find_expirable(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                matches!(b.status, BookingStatus::Pending | BookingStatus::Paid)
                    && b.check_in < now
            })
            .take(limit as usize)
            .map(|b| b.clone())
            .collect())
    }

    async fn find_completable(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> DomainResult<Vec<Booking>> {
        Ok(self
            .bookings
            .iter()
            .filter(|b| {
                matches!(b.status, BookingStatus::Verified | BookingStatus::InUse)
                    && b.check_out < now
            })
            .take(limit as usize)
            .map(|b| b.clone())
            .collect())
    }
}

// ── ResourceRepository ──────────────────────────────────────────

#[async_trait]
impl ResourceRepository for InMemoryRepositoryProvider {
    async fn insert_room(&self, room: Room) -> DomainResult<()> {
        if self.rooms.contains_key(&room.id) {
            return Err(DomainError::Conflict(format!("room {} already exists", room.id)));
        }
        self.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn find_room(&self, id: &str) -> DomainResult<Option<Room>> {
        Ok(self.rooms.get(id).map(|r| r.clone()))
    }

    async fn list_rooms_for_hotel(&self, hotel_id: &str) -> DomainResult<Vec<Room>> {
        Ok(self
            .rooms
            .iter()
            .filter(|r| r.hotel_id == hotel_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn set_room_status(&self, id: &str, status: ResourceStatus) -> DomainResult<()> {
        let Some(mut room) = self.rooms.get_mut(id) else {
            return Err(DomainError::NotFound {
                entity: "Room",
                field: "id",
                value: id.to_string(),
            });
        };
        room.status = status;
        Ok(())
    }

    async fn insert_device(&self, device: Device) -> DomainResult<()> {
        if self.devices.contains_key(&device.id) {
            return Err(DomainError::Conflict(format!(
                "device {} already exists",
                device.id
            )));
        }
        self.devices.insert(device.id.clone(), device);
        Ok(())
    }

    async fn find_device(&self, id: &str) -> DomainResult<Option<Device>> {
        Ok(self.devices.get(id).map(|d| d.clone()))
    }

    async fn try_decrement_slots(&self, device_id: &str, by: i32) -> DomainResult<bool> {
        let Some(mut device) = self.devices.get_mut(device_id) else {
            return Err(DomainError::NotFound {
                entity: "Device",
                field: "id",
                value: device_id.to_string(),
            });
        };
        if device.available_slots < by {
            return Ok(false);
        }
        device.available_slots -= by;
        Ok(true)
    }

    async fn increment_slots(&self, device_id: &str, by: i32) -> DomainResult<()> {
        let Some(mut device) = self.devices.get_mut(device_id) else {
            return Err(DomainError::NotFound {
                entity: "Device",
                field: "id",
                value: device_id.to_string(),
            });
        };
        device.available_slots += by;
        Ok(())
    }
}

// ── CommissionRepository ────────────────────────────────────────

#[async_trait]
impl CommissionRepository for InMemoryRepositoryProvider {
    async fn get_or_create(&self, distributor_id: &str) -> DomainResult<CommissionAccount> {
        Ok(self
            .accounts
            .entry(distributor_id.to_string())
            .or_insert_with(|| CommissionAccount::new(distributor_id))
            .clone())
    }

    async fn find(&self, distributor_id: &str) -> DomainResult<Option<CommissionAccount>> {
        Ok(self.accounts.get(distributor_id).map(|a| a.clone()))
    }

    async fn add(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        let mut acct = self
            .accounts
            .entry(distributor_id.to_string())
            .or_insert_with(|| CommissionAccount::new(distributor_id));
        acct.available += amount;
        acct.updated_at = Utc::now();
        Ok(())
    }

    async fn try_freeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        let Some(mut acct) = self.accounts.get_mut(distributor_id) else {
            return Ok(false);
        };
        if acct.available < amount {
            return Ok(false);
        }
        acct.available -= amount;
        acct.frozen += amount;
        acct.updated_at = Utc::now();
        Ok(true)
    }

    async fn try_unfreeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        let Some(mut acct) = self.accounts.get_mut(distributor_id) else {
            return Ok(false);
        };
        if acct.frozen < amount {
            return Ok(false);
        }
        acct.frozen -= amount;
        acct.available += amount;
        acct.updated_at = Utc::now();
        Ok(true)
    }

    async fn try_confirm_withdraw(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        let Some(mut acct) = self.accounts.get_mut(distributor_id) else {
            return Ok(false);
        };
        if acct.frozen < amount {
            return Ok(false);
        }
        acct.frozen -= amount;
        acct.withdrawn += amount;
        acct.updated_at = Utc::now();
        Ok(true)
    }
}

// ── CouponRepository ────────────────────────────────────────────

#[async_trait]
impl CouponRepository for InMemoryRepositoryProvider {
    async fn insert(&self, coupon: CouponLedger) -> DomainResult<()> {
        if self.coupons.contains_key(&coupon.id) {
            return Err(DomainError::Conflict(format!(
                "coupon {} already exists",
                coupon.id
            )));
        }
        self.coupons.insert(coupon.id.clone(), coupon);
        Ok(())
    }

    async fn find(&self, id: &str) -> DomainResult<Option<CouponLedger>> {
        Ok(self.coupons.get(id).map(|c| c.clone()))
    }

    async fn try_issue(&self, id: &str) -> DomainResult<bool> {
        let Some(mut coupon) = self.coupons.get_mut(id) else {
            return Err(DomainError::NotFound {
                entity: "Coupon",
                field: "id",
                value: id.to_string(),
            });
        };
        if coupon.issued_count >= coupon.total_count {
            return Ok(false);
        }
        coupon.issued_count += 1;
        Ok(true)
    }

    async fn try_mark_used(&self, id: &str) -> DomainResult<bool> {
        let Some(mut coupon) = self.coupons.get_mut(id) else {
            return Err(DomainError::NotFound {
                entity: "Coupon",
                field: "id",
                value: id.to_string(),
            });
        };
        if coupon.used_count >= coupon.issued_count {
            return Ok(false);
        }
        coupon.used_count += 1;
        Ok(true)
    }
}

// ── Tests ──────────────────────────────────────────────────────
