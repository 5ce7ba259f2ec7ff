//! Commission account entity
//!
//! `total` is never stored: it is always `available + frozen + withdrawn`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commission_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub distributor_id: String,

    pub available: i64,
    pub frozen: i64,
    pub withdrawn: i64,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
