//! SeaORM implementation of CouponRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::coupon::{CouponLedger, CouponRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::coupon;

pub struct SeaOrmCouponRepository {
    db: DatabaseConnection,
}

impl SeaOrmCouponRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Bump `target` by one where `target < ceiling`. Zero affected rows
    /// with an existing ledger means the cap was hit.
    async fn bump_counter(
        &self,
        id: &str,
        target: coupon::Column,
        ceiling: coupon::Column,
    ) -> DomainResult<bool> {
        let result = coupon::Entity::update_many()
            .col_expr(target, Expr::col(target).add(1))
            .filter(coupon::Column::Id.eq(id))
            .filter(Expr::col(target).lt(Expr::col(ceiling)))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 1 {
            return Ok(true);
        }
        match self.find(id).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::NotFound {
                entity: "Coupon",
                field: "id",
                value: id.to_string(),
            }),
        }
    }
}

fn model_to_domain(m: coupon::Model) -> CouponLedger {
    CouponLedger {
        id: m.id,
        name: m.name,
        total_count: m.total_count,
        issued_count: m.issued_count,
        used_count: m.used_count,
        created_at: m.created_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

#[async_trait]
impl CouponRepository for SeaOrmCouponRepository {
    async fn insert(&self, c: CouponLedger) -> DomainResult<()> {
        debug!("Saving coupon ledger: {}", c.id);

        if self.find(&c.id).await?.is_some() {
            return Err(DomainError::Conflict(format!(
                "coupon {} already exists",
                c.id
            )));
        }

        let model = coupon::ActiveModel {
            id: Set(c.id),
            name: Set(c.name),
            total_count: Set(c.total_count),
            issued_count: Set(c.issued_count),
            used_count: Set(c.used_count),
            created_at: Set(c.created_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find(&self, id: &str) -> DomainResult<Option<CouponLedger>> {
        let model = coupon::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn try_issue(&self, id: &str) -> DomainResult<bool> {
        self.bump_counter(id, coupon::Column::IssuedCount, coupon::Column::TotalCount)
            .await
    }

    async fn try_mark_used(&self, id: &str) -> DomainResult<bool> {
        self.bump_counter(id, coupon::Column::UsedCount, coupon::Column::IssuedCount)
            .await
    }
}
