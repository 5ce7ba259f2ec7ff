//! SeaORM implementation of BookingRepository
//!
//! Status transitions are single `UPDATE ... WHERE status IN (...)`
//! statements; the affected-row count is the success signal, so the guard
//! holds under any isolation level.

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::booking::{Booking, BookingRepository, BookingStatus, TransitionPatch};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::booking;

use chrono::{DateTime, Utc};

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    let status = BookingStatus::from_str(&m.status)?;
    Ok(Booking {
        id: m.id,
        booking_no: m.booking_no,
        order_id: m.order_id,
        user_id: m.user_id,
        hotel_id: m.hotel_id,
        room_id: m.room_id,
        device_id: m.device_id,
        check_in: m.check_in,
        check_out: m.check_out,
        duration_hours: m.duration_hours,
        amount: m.amount,
        verification_code: m.verification_code,
        unlock_code: m.unlock_code,
        qr_code: m.qr_code,
        status,
        verified_at: m.verified_at,
        verified_by: m.verified_by,
        unlocked_at: m.unlocked_at,
        completed_at: m.completed_at,
        created_at: m.created_at,
    })
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

fn blocking_statuses() -> Vec<&'static str> {
    [
        BookingStatus::Pending,
        BookingStatus::Paid,
        BookingStatus::Verified,
        BookingStatus::InUse,
    ]
    .iter()
    .map(|s| s.as_str())
    .collect()
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn insert(&self, b: Booking) -> DomainResult<()> {
        debug!("Saving booking: {}", b.id);

        let model = booking::ActiveModel {
            id: Set(b.id),
            booking_no: Set(b.booking_no),
            order_id: Set(b.order_id),
            user_id: Set(b.user_id),
            hotel_id: Set(b.hotel_id),
            room_id: Set(b.room_id),
            device_id: Set(b.device_id),
            check_in: Set(b.check_in),
            check_out: Set(b.check_out),
            duration_hours: Set(b.duration_hours),
            amount: Set(b.amount),
            verification_code: Set(b.verification_code),
            unlock_code: Set(b.unlock_code),
            qr_code: Set(b.qr_code),
            status: Set(b.status.as_str().to_string()),
            verified_at: Set(b.verified_at),
            verified_by: Set(b.verified_by),
            unlocked_at: Set(b.unlocked_at),
            completed_at: Set(b.completed_at),
            created_at: Set(b.created_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::OrderId.eq(order_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_by_verification_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::VerificationCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_by_unlock_code(&self, code: &str) -> DomainResult<Option<Booking>> {
        let model = booking::Entity::find()
            .filter(booking::Column::UnlockCode.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn code_in_use(&self, code: &str) -> DomainResult<bool> {
        let count = booking::Entity::find()
            .filter(
                Condition::any()
                    .add(booking::Column::VerificationCode.eq(code))
                    .add(booking::Column::UnlockCode.eq(code))
                    .add(booking::Column::QrCode.eq(code)),
            )
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn find_overlapping(
        &self,
        room_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<Booking>> {
        // Half-open overlap: existing.check_in < end AND existing.check_out > start
        let models = booking::Entity::find()
            .filter(booking::Column::RoomId.eq(room_id))
            .filter(booking::Column::Status.is_in(blocking_statuses()))
            .filter(booking::Column::CheckIn.lt(end))
            .filter(booking::Column::CheckOut.gt(start))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_active_for_room(&self, room_id: &str) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::RoomId.eq(room_id))
            .filter(booking::Column::Status.is_in(blocking_statuses()))
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_for_user(&self, user_id: &str) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::UserId.eq(user_id))
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn apply_transition(
        &self,
        id: &str,
        from: &[BookingStatus],
        to: BookingStatus,
        patch: TransitionPatch,
    ) -> DomainResult<bool> {
        let from_strs: Vec<&'static str> = from.iter().map(|s| s.as_str()).collect();

        let mut update = booking::Entity::update_many()
            .col_expr(booking::Column::Status, Expr::value(to.as_str()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.is_in(from_strs));

        if let Some(ts) = patch.verified_at {
            update = update.col_expr(booking::Column::VerifiedAt, Expr::value(ts));
        }
        if let Some(by) = patch.verified_by {
            update = update.col_expr(booking::Column::VerifiedBy, Expr::value(by));
        }
        if let Some(ts) = patch.unlocked_at {
            update = update.col_expr(booking::Column::UnlockedAt, Expr::value(ts));
        }
        if let Some(ts) = patch.completed_at {
            update = update.col_expr(booking::Column::CompletedAt, Expr::value(ts));
        }

        let result = update.exec(&self.db).await.map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }

    async fn find_expirable(&self, now: DateTime<Utc>, limit: u64) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.is_in([
                BookingStatus::Pending.as_str(),
                BookingStatus::Paid.as_str(),
            ]))
            .filter(booking::Column::CheckIn.lt(now))
            .order_by_asc(booking::Column::CheckIn)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }

    async fn find_completable(
        &self,
        now: DateTime<Utc>,
        limit: u64,
    ) -> DomainResult<Vec<Booking>> {
        let models = booking::Entity::find()
            .filter(booking::Column::Status.is_in([
                BookingStatus::Verified.as_str(),
                BookingStatus::InUse.as_str(),
            ]))
            .filter(booking::Column::CheckOut.lt(now))
            .order_by_asc(booking::Column::CheckOut)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models.into_iter().map(model_to_domain).collect()
    }
}
