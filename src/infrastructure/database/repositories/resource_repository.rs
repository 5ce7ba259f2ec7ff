//! SeaORM implementation of ResourceRepository
//!
//! Slot counters move through conditional `UPDATE ... WHERE
//! available_slots >= n` statements so a counter can never go negative,
//! no matter how many writers race.

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::resource::{Device, ResourceRepository, ResourceStatus, Room};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{device, room};

pub struct SeaOrmResourceRepository {
    db: DatabaseConnection,
}

impl SeaOrmResourceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn room_to_domain(m: room::Model) -> Room {
    Room {
        id: m.id,
        hotel_id: m.hotel_id,
        room_no: m.room_no,
        status: ResourceStatus::from_str(&m.status),
        created_at: m.created_at,
    }
}

fn device_to_domain(m: device::Model) -> Device {
    Device {
        id: m.id,
        hotel_id: m.hotel_id,
        name: m.name,
        total_slots: m.total_slots,
        available_slots: m.available_slots,
        status: ResourceStatus::from_str(&m.status),
        created_at: m.created_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

#[async_trait]
impl ResourceRepository for SeaOrmResourceRepository {
    async fn insert_room(&self, r: Room) -> DomainResult<()> {
        debug!("Saving room: {}", r.id);

        let model = room::ActiveModel {
            id: Set(r.id),
            hotel_id: Set(r.hotel_id),
            room_no: Set(r.room_no),
            status: Set(r.status.as_str().to_string()),
            created_at: Set(r.created_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_room(&self, id: &str) -> DomainResult<Option<Room>> {
        let model = room::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(room_to_domain))
    }

    async fn list_rooms_for_hotel(&self, hotel_id: &str) -> DomainResult<Vec<Room>> {
        let models = room::Entity::find()
            .filter(room::Column::HotelId.eq(hotel_id))
            .order_by_asc(room::Column::RoomNo)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(room_to_domain).collect())
    }

    async fn set_room_status(&self, id: &str, status: ResourceStatus) -> DomainResult<()> {
        let result = room::Entity::update_many()
            .col_expr(room::Column::Status, Expr::value(status.as_str()))
            .filter(room::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Room",
                field: "id",
                value: id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_device(&self, d: Device) -> DomainResult<()> {
        debug!("Saving device: {}", d.id);

        let model = device::ActiveModel {
            id: Set(d.id),
            hotel_id: Set(d.hotel_id),
            name: Set(d.name),
            total_slots: Set(d.total_slots),
            available_slots: Set(d.available_slots),
            status: Set(d.status.as_str().to_string()),
            created_at: Set(d.created_at),
        };
        model.insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_device(&self, id: &str) -> DomainResult<Option<Device>> {
        let model = device::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(device_to_domain))
    }

    async fn try_decrement_slots(&self, device_id: &str, by: i32) -> DomainResult<bool> {
        let result = device::Entity::update_many()
            .col_expr(
                device::Column::AvailableSlots,
                Expr::col(device::Column::AvailableSlots).sub(by),
            )
            .filter(device::Column::Id.eq(device_id))
            .filter(device::Column::AvailableSlots.gte(by))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 1 {
            return Ok(true);
        }

        // Zero rows means either the device is missing or the counter is
        // exhausted; only the latter is a business outcome.
        match self.find_device(device_id).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::NotFound {
                entity: "Device",
                field: "id",
                value: device_id.to_string(),
            }),
        }
    }

    async fn increment_slots(&self, device_id: &str, by: i32) -> DomainResult<()> {
        let result = device::Entity::update_many()
            .col_expr(
                device::Column::AvailableSlots,
                Expr::col(device::Column::AvailableSlots).add(by),
            )
            .filter(device::Column::Id.eq(device_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound {
                entity: "Device",
                field: "id",
                value: device_id.to_string(),
            });
        }
        Ok(())
    }
}
