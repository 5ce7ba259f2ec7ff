//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::commission::CommissionRepository;
use crate::domain::coupon::CouponRepository;
use crate::domain::resource::ResourceRepository;
use crate::domain::RepositoryProvider;

use super::booking_repository::SeaOrmBookingRepository;
use super::commission_repository::SeaOrmCommissionRepository;
use super::coupon_repository::SeaOrmCouponRepository;
use super::resource_repository::SeaOrmResourceRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let booking = repos.bookings().find_by_order_id("ORD-1").await?;
/// let room = repos.resources().find_room(&booking.room_id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    bookings: SeaOrmBookingRepository,
    resources: SeaOrmResourceRepository,
    commissions: SeaOrmCommissionRepository,
    coupons: SeaOrmCouponRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            bookings: SeaOrmBookingRepository::new(db.clone()),
            resources: SeaOrmResourceRepository::new(db.clone()),
            commissions: SeaOrmCommissionRepository::new(db.clone()),
            coupons: SeaOrmCouponRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn resources(&self) -> &dyn ResourceRepository {
        &self.resources
    }

    fn commissions(&self) -> &dyn CommissionRepository {
        &self.commissions
    }

    fn coupons(&self) -> &dyn CouponRepository {
        &self.coupons
    }
}
