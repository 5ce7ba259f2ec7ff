//! SeaORM entity definitions

pub mod booking;
pub mod commission_account;
pub mod coupon;
pub mod device;
pub mod room;
