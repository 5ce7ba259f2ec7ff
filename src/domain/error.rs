use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    /// Expected business rejection: resource taken, slot lost to a
    /// concurrent caller. Retryable by the caller, never by the core.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Programming/integration defect: a transition was requested from a
    /// state that does not allow it. Surfaced loudly, never swallowed.
    #[error("Invalid transition: {current} does not allow {requested}")]
    InvalidTransition {
        current: String,
        requested: &'static str,
    },

    #[error("Insufficient capacity on {resource}")]
    InsufficientCapacity { resource: String },

    #[error("Insufficient available balance on account {account}")]
    InsufficientBalance { account: String },

    #[error("Insufficient frozen balance on account {account}")]
    InsufficientFrozen { account: String },

    #[error("Coupon {coupon} is exhausted")]
    CouponExhausted { coupon: String },

    /// Transient infrastructure failure (connection lost, timeout).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Storage(_))
    }

    /// Whether this error is an expected business outcome rather than a
    /// defect. Business outcomes are logged at info/debug, defects at error.
    pub fn is_business_outcome(&self) -> bool {
        matches!(
            self,
            DomainError::Conflict(_)
                | DomainError::NotFound { .. }
                | DomainError::InsufficientCapacity { .. }
                | DomainError::InsufficientBalance { .. }
                | DomainError::InsufficientFrozen { .. }
                | DomainError::CouponExhausted { .. }
        )
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_transient() {
        assert!(DomainError::Storage("connection reset".into()).is_transient());
        assert!(!DomainError::Validation("bad interval".into()).is_transient());
    }

    #[test]
    fn invalid_transition_is_not_a_business_outcome() {
        let err = DomainError::InvalidTransition {
            current: "Completed".into(),
            requested: "verify",
        };
        assert!(!err.is_business_outcome());
        assert!(err.to_string().contains("Completed"));
        assert!(err.to_string().contains("verify"));
    }

    #[test]
    fn conflict_is_a_business_outcome() {
        assert!(DomainError::Conflict("room taken".into()).is_business_outcome());
    }
}
