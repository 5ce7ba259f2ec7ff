//! Coupon ledger repository interface

use async_trait::async_trait;

use super::model::CouponLedger;
use crate::domain::DomainResult;

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn insert(&self, coupon: CouponLedger) -> DomainResult<()>;

    async fn find(&self, id: &str) -> DomainResult<Option<CouponLedger>>;

    /// Increment `issued_count` only where `issued_count < total_count`.
    /// Returns whether a coupon was actually issued.
    async fn try_issue(&self, id: &str) -> DomainResult<bool>;

    /// Increment `used_count` only where `used_count < issued_count`.
    async fn try_mark_used(&self, id: &str) -> DomainResult<bool>;
}
