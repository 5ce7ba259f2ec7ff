//! Distributor commission account

use chrono::{DateTime, Utc};

/// Three-state commission balance. `total()` is always derived, never
/// stored, so `total = available + frozen + withdrawn` holds by
/// construction.
#[derive(Debug, Clone)]
pub struct CommissionAccount {
    pub distributor_id: String,
    /// Spendable balance, in minor currency units
    pub available: i64,
    /// Reserved by a pending withdrawal request
    pub frozen: i64,
    /// Paid out
    pub withdrawn: i64,
    pub updated_at: DateTime<Utc>,
}

impl CommissionAccount {
    pub fn new(distributor_id: impl Into<String>) -> Self {
        Self {
            distributor_id: distributor_id.into(),
            available: 0,
            frozen: 0,
            withdrawn: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn total(&self) -> i64 {
        self.available + self.frozen + self.withdrawn
    }
}
