//! Access code issuance and resolution
//!
//! Mints the staff-facing verification code, the device-facing unlock code
//! and the guest QR token for a booking, and validates them at the two
//! points of use. Codes are generated once at creation, collision-checked
//! against every active and historical booking, and immutable thereafter.

use std::sync::Arc;

use log::{debug, warn};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::domain::{AccessCodes, Booking, BookingStatus, DomainError, DomainResult, RepositoryProvider};

/// QR token prefix for identification
const QR_PREFIX: &str = "lgqr_";

/// How many generation attempts before a collision is treated as a fault
const MAX_CODE_ATTEMPTS: u32 = 5;

pub struct CodeIssuer {
    repos: Arc<dyn RepositoryProvider>,
}

impl CodeIssuer {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Mint the three codes for a booking. Each code is retried on
    /// collision rather than merely hoped to be unique.
    pub async fn issue_codes(&self, booking_id: &str) -> DomainResult<AccessCodes> {
        let verification_code = self
            .unique_code(|| Self::numeric_code(8), "verification")
            .await?;
        let unlock_code = self.unique_code(|| Self::numeric_code(6), "unlock").await?;
        let qr_code = self
            .unique_code(|| Self::qr_token(booking_id), "qr")
            .await?;

        debug!("Issued codes for booking {}", booking_id);
        Ok(AccessCodes {
            verification_code,
            unlock_code,
            qr_code,
        })
    }

    /// Staff-facing lookup for the front-desk check-in flow. Any status
    /// resolves; the caller decides what the status permits.
    pub async fn resolve_by_verification_code(&self, code: &str) -> DomainResult<Booking> {
        self.repos
            .bookings()
            .find_by_verification_code(code)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "Booking",
                field: "verification_code",
                value: code.to_string(),
            })
    }

    /// Device-facing lookup authorizing a physical unlock. Resolves only if
    /// the booking is Verified or InUse and bound to `resource_id` (its room
    /// or its device), so a device may idempotently retry the unlock command
    /// while InUse. Everything else is NotFound: deny access without
    /// revealing whether the code exists or belongs to another state.
    pub async fn resolve_by_unlock_code(
        &self,
        code: &str,
        resource_id: &str,
    ) -> DomainResult<Booking> {
        let denied = || DomainError::NotFound {
            entity: "Booking",
            field: "unlock_code",
            value: code.to_string(),
        };

        let booking = self
            .repos
            .bookings()
            .find_by_unlock_code(code)
            .await?
            .ok_or_else(denied)?;

        let bound = booking.room_id == resource_id
            || booking.device_id.as_deref() == Some(resource_id);
        let unlockable = matches!(booking.status, BookingStatus::Verified | BookingStatus::InUse);

        if !bound || !unlockable {
            debug!(
                "Unlock denied for booking {} (status {}, resource {})",
                booking.id, booking.status, resource_id
            );
            return Err(denied());
        }
        Ok(booking)
    }

    /// Date-prefixed human-readable booking reference,
    /// e.g. `BK20260830-483920`.
    pub fn next_booking_no(&self) -> String {
        let mut rng = rand::thread_rng();
        format!(
            "BK{}-{:06}",
            chrono::Utc::now().format("%Y%m%d"),
            rng.gen_range(0..1_000_000)
        )
    }

    async fn unique_code<F>(&self, mut gen: F, kind: &str) -> DomainResult<String>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let candidate = gen();
            if !self.repos.bookings().code_in_use(&candidate).await? {
                return Ok(candidate);
            }
            warn!(
                "{} code collision on attempt {}/{}",
                kind, attempt, MAX_CODE_ATTEMPTS
            );
        }
        Err(DomainError::Storage(format!(
            "could not mint a unique {} code after {} attempts",
            kind, MAX_CODE_ATTEMPTS
        )))
    }

    fn numeric_code(digits: u32) -> String {
        let mut rng = rand::thread_rng();
        let upper = 10u64.pow(digits);
        format!("{:0width$}", rng.gen_range(0..upper), width = digits as usize)
    }

    /// High-entropy QR token: `lgqr_<sha256(booking_id || nonce)[..32]>`
    fn qr_token(booking_id: &str) -> String {
        let mut rng = rand::thread_rng();
        let nonce: [u8; 16] = rng.gen();

        let mut hasher = Sha256::new();
        hasher.update(booking_id.as_bytes());
        hasher.update(nonce);
        let digest = hex::encode(hasher.finalize());
        format!("{}{}", QR_PREFIX, &digest[..32])
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Booking;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;
    use chrono::{Duration, Utc};

    fn provider() -> Arc<dyn RepositoryProvider> {
        Arc::new(InMemoryRepositoryProvider::new())
    }

    async fn insert_booking(repos: &Arc<dyn RepositoryProvider>, status: BookingStatus) -> Booking {
        let start = Utc::now();
        let mut b = Booking::new(
            "b-1",
            "BK-1",
            "ORD-1",
            "user-1",
            "hotel-1",
            "room-101",
            Some("dev-9".to_string()),
            start,
            start + Duration::hours(2),
            50_000,
            AccessCodes {
                verification_code: "11112222".into(),
                unlock_code: "333444".into(),
                qr_code: "lgqr_test".into(),
            },
        );
        b.status = status;
        repos.bookings().insert(b.clone()).await.unwrap();
        b
    }

    #[tokio::test]
    async fn issued_codes_have_expected_shape() {
        let repos = provider();
        let issuer = CodeIssuer::new(repos);
        let codes = issuer.issue_codes("b-1").await.unwrap();

        assert_eq!(codes.verification_code.len(), 8);
        assert!(codes.verification_code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(codes.unlock_code.len(), 6);
        assert!(codes.unlock_code.chars().all(|c| c.is_ascii_digit()));
        assert!(codes.qr_code.starts_with(QR_PREFIX));
        assert_eq!(codes.qr_code.len(), QR_PREFIX.len() + 32);
    }

    #[tokio::test]
    async fn verification_code_resolves_any_status() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::Pending).await;
        let issuer = CodeIssuer::new(repos);

        let found = issuer.resolve_by_verification_code("11112222").await.unwrap();
        assert_eq!(found.id, "b-1");

        let err = issuer.resolve_by_verification_code("00000000").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unlock_code_requires_verified_or_in_use() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::Paid).await;
        let issuer = CodeIssuer::new(repos);

        // Paid but not yet verified: deny
        let err = issuer.resolve_by_unlock_code("333444", "room-101").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unlock_code_resolves_for_bound_resource_only() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::Verified).await;
        let issuer = CodeIssuer::new(repos);

        // room binding
        assert!(issuer.resolve_by_unlock_code("333444", "room-101").await.is_ok());
        // device binding
        assert!(issuer.resolve_by_unlock_code("333444", "dev-9").await.is_ok());
        // some other device: deny
        let err = issuer.resolve_by_unlock_code("333444", "dev-2").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unlock_code_still_resolves_while_in_use() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::InUse).await;
        let issuer = CodeIssuer::new(repos);

        // device retries of the unlock command stay authorized
        assert!(issuer.resolve_by_unlock_code("333444", "room-101").await.is_ok());
    }

    #[tokio::test]
    async fn completed_booking_no_longer_unlocks() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::Completed).await;
        let issuer = CodeIssuer::new(repos);

        let err = issuer.resolve_by_unlock_code("333444", "room-101").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn issuance_avoids_existing_codes() {
        let repos = provider();
        insert_booking(&repos, BookingStatus::Pending).await;
        let issuer = CodeIssuer::new(repos.clone());

        // Freshly issued codes must not collide with the stored ones.
        let codes = issuer.issue_codes("b-2").await.unwrap();
        assert_ne!(codes.verification_code, "11112222");
        assert_ne!(codes.unlock_code, "333444");
        assert!(!repos.bookings().code_in_use(&codes.qr_code).await.unwrap());
    }

    #[test]
    fn booking_no_is_date_prefixed() {
        let issuer = CodeIssuer::new(provider());
        let no = issuer.next_booking_no();
        assert!(no.starts_with(&format!("BK{}", chrono::Utc::now().format("%Y%m%d"))));
    }
}
