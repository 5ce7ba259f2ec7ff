//! Core business entities, repository traits and the error taxonomy

pub mod booking;
pub mod commission;
pub mod coupon;
pub mod error;
pub mod resource;

// Re-export commonly used types
pub use booking::{AccessCodes, Booking, BookingRepository, BookingStatus, TransitionPatch};
pub use commission::{CommissionAccount, CommissionRepository};
pub use coupon::{CouponLedger, CouponRepository};
pub use error::{DomainError, DomainResult};
pub use resource::{Device, ResourceRepository, ResourceStatus, Room};

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let booking = repos.bookings().find_by_id("b-1").await?;
///     let room = repos.resources().find_room(&booking.room_id).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn bookings(&self) -> &dyn BookingRepository;
    fn resources(&self) -> &dyn ResourceRepository;
    fn commissions(&self) -> &dyn CommissionRepository;
    fn coupons(&self) -> &dyn CouponRepository;
}
