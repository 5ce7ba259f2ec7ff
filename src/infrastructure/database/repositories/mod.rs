//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod commission_repository;
pub mod coupon_repository;
pub mod repository_provider;
pub mod resource_repository;

pub use repository_provider::SeaOrmRepositoryProvider;
