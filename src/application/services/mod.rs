pub mod allocator;
pub mod booking;
pub mod codes;
pub mod commission;
pub mod coupon;
pub mod reconciliation;

pub use allocator::{AllocatorConfig, IntervalAllocator};
pub use booking::{BookingService, NewBookingRequest};
pub use codes::CodeIssuer;
pub use commission::CommissionService;
pub use coupon::CouponService;
pub use reconciliation::{ReconciliationConfig, ReconciliationScheduler, SweepOutcome};
