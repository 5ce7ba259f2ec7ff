//! Commission account repository interface
//!
//! Every balance move is a single conditional update validated against its
//! own precondition; `false` means the precondition failed and the caller
//! must surface a typed error.

use async_trait::async_trait;

use super::model::CommissionAccount;
use crate::domain::DomainResult;

#[async_trait]
pub trait CommissionRepository: Send + Sync {
    /// Fetch the account, creating an empty one on first use
    async fn get_or_create(&self, distributor_id: &str) -> DomainResult<CommissionAccount>;

    async fn find(&self, distributor_id: &str) -> DomainResult<Option<CommissionAccount>>;

    /// Credit earned commission to `available`
    async fn add(&self, distributor_id: &str, amount: i64) -> DomainResult<()>;

    /// Move `amount` from available to frozen where `available >= amount`
    async fn try_freeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool>;

    /// Move `amount` from frozen back to available where `frozen >= amount`
    async fn try_unfreeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool>;

    /// Move `amount` from frozen to withdrawn where `frozen >= amount`
    async fn try_confirm_withdraw(&self, distributor_id: &str, amount: i64) -> DomainResult<bool>;
}
