pub mod model;
pub mod repository;

pub use model::CouponLedger;
pub use repository::CouponRepository;
