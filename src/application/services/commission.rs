//! Distributor commission balances
//!
//! Maps failed conditional updates from the repository to typed business
//! errors. A failed precondition (not enough available, not enough frozen)
//! is an expected outcome, distinguishable from storage failure.

use std::sync::Arc;

use log::info;

use crate::domain::{CommissionAccount, DomainError, DomainResult, RepositoryProvider};

pub struct CommissionService {
    repos: Arc<dyn RepositoryProvider>,
}

impl CommissionService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Credit earned commission, provisioning the account on first use
    pub async fn add_commission(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        Self::validate_amount(amount)?;
        self.repos.commissions().get_or_create(distributor_id).await?;
        self.repos.commissions().add(distributor_id, amount).await?;
        info!("Commission +{} for distributor {}", amount, distributor_id);
        Ok(())
    }

    /// Withdrawal request: move available -> frozen
    pub async fn freeze(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        Self::validate_amount(amount)?;
        let ok = self.repos.commissions().try_freeze(distributor_id, amount).await?;
        if !ok {
            return Err(DomainError::InsufficientBalance {
                account: distributor_id.to_string(),
            });
        }
        info!("Froze {} for distributor {}", amount, distributor_id);
        Ok(())
    }

    /// Withdrawal rejected: move frozen -> available
    pub async fn unfreeze(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        Self::validate_amount(amount)?;
        let ok = self.repos.commissions().try_unfreeze(distributor_id, amount).await?;
        if !ok {
            return Err(DomainError::InsufficientFrozen {
                account: distributor_id.to_string(),
            });
        }
        Ok(())
    }

    /// Withdrawal paid out: move frozen -> withdrawn
    pub async fn confirm_withdraw(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        Self::validate_amount(amount)?;
        let ok = self
            .repos
            .commissions()
            .try_confirm_withdraw(distributor_id, amount)
            .await?;
        if !ok {
            return Err(DomainError::InsufficientFrozen {
                account: distributor_id.to_string(),
            });
        }
        info!("Withdrawal of {} confirmed for {}", amount, distributor_id);
        Ok(())
    }

    pub async fn account(&self, distributor_id: &str) -> DomainResult<CommissionAccount> {
        self.repos.commissions().get_or_create(distributor_id).await
    }

    fn validate_amount(amount: i64) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::Validation(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service() -> CommissionService {
        CommissionService::new(Arc::new(InMemoryRepositoryProvider::new()))
    }

    #[tokio::test]
    async fn withdrawal_lifecycle_keeps_total_invariant() {
        let svc = service();
        svc.add_commission("dist-1", 500).await.unwrap();

        svc.freeze("dist-1", 200).await.unwrap();
        let acct = svc.account("dist-1").await.unwrap();
        assert_eq!((acct.available, acct.frozen, acct.withdrawn), (300, 200, 0));
        assert_eq!(acct.total(), 500);

        svc.unfreeze("dist-1", 50).await.unwrap();
        svc.confirm_withdraw("dist-1", 150).await.unwrap();
        let acct = svc.account("dist-1").await.unwrap();
        assert_eq!((acct.available, acct.frozen, acct.withdrawn), (350, 0, 150));
        assert_eq!(acct.total(), 500);
    }

    #[tokio::test]
    async fn freeze_beyond_available_is_rejected_unchanged() {
        let svc = service();
        svc.add_commission("dist-1", 50).await.unwrap();

        let err = svc.freeze("dist-1", 100).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientBalance { .. }));

        let acct = svc.account("dist-1").await.unwrap();
        assert_eq!((acct.available, acct.frozen, acct.withdrawn), (50, 0, 0));
    }

    #[tokio::test]
    async fn confirm_beyond_frozen_is_rejected() {
        let svc = service();
        svc.add_commission("dist-1", 500).await.unwrap();
        svc.freeze("dist-1", 100).await.unwrap();

        let err = svc.confirm_withdraw("dist-1", 200).await.unwrap_err();
        assert!(matches!(err, DomainError::InsufficientFrozen { .. }));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_validation_errors() {
        let svc = service();
        assert!(matches!(
            svc.add_commission("dist-1", 0).await.unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            svc.freeze("dist-1", -5).await.unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_freezes_never_overdraw() {
        let svc = Arc::new(service());
        svc.add_commission("dist-1", 100).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move { svc.freeze("dist-1", 30).await }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        // 100 available, 30 each: at most 3 can win
        assert_eq!(wins, 3);
        let acct = svc.account("dist-1").await.unwrap();
        assert_eq!(acct.available, 10);
        assert_eq!(acct.frozen, 90);
        assert_eq!(acct.total(), 100);
    }
}
