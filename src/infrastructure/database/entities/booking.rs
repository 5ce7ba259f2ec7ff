//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub booking_no: String,

    #[sea_orm(unique)]
    pub order_id: String,

    pub user_id: String,
    pub hotel_id: String,
    pub room_id: String,

    #[sea_orm(nullable)]
    pub device_id: Option<String>,

    pub check_in: DateTimeUtc,
    pub check_out: DateTimeUtc,
    pub duration_hours: i32,

    /// Amount in minor currency units
    pub amount: i64,

    #[sea_orm(unique)]
    pub verification_code: String,

    #[sea_orm(unique)]
    pub unlock_code: String,

    #[sea_orm(unique)]
    pub qr_code: String,

    /// Booking status: Pending, Paid, Verified, InUse, Completed,
    /// Cancelled, Refunded, Expired
    pub status: String,

    #[sea_orm(nullable)]
    pub verified_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub verified_by: Option<String>,

    #[sea_orm(nullable)]
    pub unlocked_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub completed_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::room::Entity",
        from = "Column::RoomId",
        to = "super::room::Column::Id"
    )]
    Room,
}

impl Related<super::room::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Room.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
