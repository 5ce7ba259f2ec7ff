//! SeaORM implementation of CommissionRepository
//!
//! Balance moves are single conditional updates; the precondition lives in
//! the WHERE clause, so two racing withdrawals can never overdraw.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::domain::commission::{CommissionAccount, CommissionRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::commission_account;

pub struct SeaOrmCommissionRepository {
    db: DatabaseConnection,
}

impl SeaOrmCommissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn shift_balance(
        &self,
        distributor_id: &str,
        from: commission_account::Column,
        to: commission_account::Column,
        amount: i64,
    ) -> DomainResult<bool> {
        let result = commission_account::Entity::update_many()
            .col_expr(from, Expr::col(from).sub(amount))
            .col_expr(to, Expr::col(to).add(amount))
            .col_expr(commission_account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(commission_account::Column::DistributorId.eq(distributor_id))
            .filter(from.gte(amount))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}

fn model_to_domain(m: commission_account::Model) -> CommissionAccount {
    CommissionAccount {
        distributor_id: m.distributor_id,
        available: m.available,
        frozen: m.frozen,
        withdrawn: m.withdrawn,
        updated_at: m.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

#[async_trait]
impl CommissionRepository for SeaOrmCommissionRepository {
    async fn get_or_create(&self, distributor_id: &str) -> DomainResult<CommissionAccount> {
        if let Some(existing) = self.find(distributor_id).await? {
            return Ok(existing);
        }

        debug!("Creating commission account for distributor: {distributor_id}");
        let fresh = CommissionAccount::new(distributor_id);
        let model = commission_account::ActiveModel {
            distributor_id: Set(fresh.distributor_id.clone()),
            available: Set(fresh.available),
            frozen: Set(fresh.frozen),
            withdrawn: Set(fresh.withdrawn),
            updated_at: Set(fresh.updated_at),
        };
        match model.insert(&self.db).await {
            Ok(_) => Ok(fresh),
            // A concurrent creator beat us to the primary key; theirs wins.
            Err(_) => self.find(distributor_id).await?.ok_or_else(|| {
                DomainError::Storage(format!(
                    "commission account {distributor_id} vanished during create"
                ))
            }),
        }
    }

    async fn find(&self, distributor_id: &str) -> DomainResult<Option<CommissionAccount>> {
        let model = commission_account::Entity::find_by_id(distributor_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn add(&self, distributor_id: &str, amount: i64) -> DomainResult<()> {
        self.get_or_create(distributor_id).await?;

        let result = commission_account::Entity::update_many()
            .col_expr(
                commission_account::Column::Available,
                Expr::col(commission_account::Column::Available).add(amount),
            )
            .col_expr(commission_account::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(commission_account::Column::DistributorId.eq(distributor_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::Storage(format!(
                "commission account {distributor_id} vanished during credit"
            )));
        }
        Ok(())
    }

    async fn try_freeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        self.shift_balance(
            distributor_id,
            commission_account::Column::Available,
            commission_account::Column::Frozen,
            amount,
        )
        .await
    }

    async fn try_unfreeze(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        self.shift_balance(
            distributor_id,
            commission_account::Column::Frozen,
            commission_account::Column::Available,
            amount,
        )
        .await
    }

    async fn try_confirm_withdraw(&self, distributor_id: &str, amount: i64) -> DomainResult<bool> {
        self.shift_balance(
            distributor_id,
            commission_account::Column::Frozen,
            commission_account::Column::Withdrawn,
            amount,
        )
        .await
    }
}
