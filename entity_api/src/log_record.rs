//! Persistence operations for the append-only logs table.

use super::error::Error;
use crate::query::{self, QueryFilterMap};
use entity::log_records::{ActiveModel, Column, Entity, Model};
use log::*;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};

/// Inserts a new log record. The store assigns `id` and `timestamp`.
pub async fn create(
    db: &DatabaseConnection,
    level: String,
    category: String,
    message: String,
) -> Result<Model, Error> {
    debug!("Inserting new log record: level={level}, type={category}");

    let active_model = ActiveModel {
        level: Set(level),
        category: Set(category),
        message: Set(message),
        ..Default::default()
    };

    Ok(active_model.insert(db).await?)
}

/// Finds at most `limit` log records matching the filter map, newest first.
pub async fn find_latest(
    db: &DatabaseConnection,
    query_filter_map: QueryFilterMap,
    limit: u64,
) -> Result<Vec<Model>, Error> {
    query::find_latest_by::<Entity, Column>(db, query_filter_map, Column::Timestamp, limit).await
}
