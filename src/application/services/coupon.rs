//! Coupon issuance under a bounded cap

use std::sync::Arc;

use log::info;

use crate::domain::{CouponLedger, DomainError, DomainResult, RepositoryProvider};

pub struct CouponService {
    repos: Arc<dyn RepositoryProvider>,
}

impl CouponService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn create_definition(
        &self,
        id: &str,
        name: &str,
        total_count: i32,
    ) -> DomainResult<CouponLedger> {
        if total_count <= 0 {
            return Err(DomainError::Validation(format!(
                "coupon cap must be positive, got {}",
                total_count
            )));
        }
        let coupon = CouponLedger::new(id, name, total_count);
        self.repos.coupons().insert(coupon.clone()).await?;
        Ok(coupon)
    }

    /// Issue one coupon. "Exhausted" is an expected business outcome.
    pub async fn issue(&self, coupon_id: &str) -> DomainResult<()> {
        let issued = self.repos.coupons().try_issue(coupon_id).await?;
        if !issued {
            return Err(DomainError::CouponExhausted {
                coupon: coupon_id.to_string(),
            });
        }
        info!("Coupon {} issued", coupon_id);
        Ok(())
    }

    /// Record a redemption. Cannot exceed the number issued.
    pub async fn redeem(&self, coupon_id: &str) -> DomainResult<()> {
        let used = self.repos.coupons().try_mark_used(coupon_id).await?;
        if !used {
            return Err(DomainError::Conflict(format!(
                "coupon {} has no unredeemed issues",
                coupon_id
            )));
        }
        Ok(())
    }

    pub async fn ledger(&self, coupon_id: &str) -> DomainResult<Option<CouponLedger>> {
        self.repos.coupons().find(coupon_id).await
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service() -> CouponService {
        CouponService::new(Arc::new(InMemoryRepositoryProvider::new()))
    }

    #[tokio::test]
    async fn issuance_stops_at_the_cap() {
        let svc = service();
        svc.create_definition("c-1", "Promo", 2).await.unwrap();

        svc.issue("c-1").await.unwrap();
        svc.issue("c-1").await.unwrap();
        let err = svc.issue("c-1").await.unwrap_err();
        assert!(matches!(err, DomainError::CouponExhausted { .. }));

        let ledger = svc.ledger("c-1").await.unwrap().unwrap();
        assert_eq!(ledger.issued_count, 2);
        assert_eq!(ledger.remaining(), 0);
    }

    #[tokio::test]
    async fn redemption_cannot_exceed_issued() {
        let svc = service();
        svc.create_definition("c-1", "Promo", 5).await.unwrap();
        svc.issue("c-1").await.unwrap();

        svc.redeem("c-1").await.unwrap();
        let err = svc.redeem("c-1").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let ledger = svc.ledger("c-1").await.unwrap().unwrap();
        assert_eq!(ledger.used_count, 1);
    }

    #[tokio::test]
    async fn concurrent_issues_respect_the_cap() {
        let svc = Arc::new(service());
        svc.create_definition("c-1", "Promo", 3).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move { svc.issue("c-1").await }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 3);
        let ledger = svc.ledger("c-1").await.unwrap().unwrap();
        assert_eq!(ledger.issued_count, 3);
    }

    #[tokio::test]
    async fn zero_cap_definition_is_rejected() {
        let svc = service();
        let err = svc.create_definition("c-1", "Promo", 0).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
