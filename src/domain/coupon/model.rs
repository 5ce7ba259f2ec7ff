//! Coupon issuance ledger

use chrono::{DateTime, Utc};

/// Per-definition issuance counters.
/// Invariants: `issued_count <= total_count`, counts never negative.
#[derive(Debug, Clone)]
pub struct CouponLedger {
    pub id: String,
    pub name: String,
    pub total_count: i32,
    pub issued_count: i32,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

impl CouponLedger {
    pub fn new(id: impl Into<String>, name: impl Into<String>, total_count: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            total_count,
            issued_count: 0,
            used_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn remaining(&self) -> i32 {
        self.total_count - self.issued_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ledger_has_full_remaining() {
        let c = CouponLedger::new("c-1", "Opening promo", 100);
        assert_eq!(c.remaining(), 100);
        assert_eq!(c.used_count, 0);
    }
}
