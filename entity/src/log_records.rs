//! SeaORM Entity for the logs table.
//! Rows are append-only: inserted once, never updated.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::log_records::Model)]
#[sea_orm(schema_name = "log_relay", table_name = "logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Id,

    /// Insertion time, assigned by the store
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTimeUtc,

    /// Severity such as INFO, WARNING, ERROR or DEBUG. Not a closed set.
    pub level: String,

    /// Source category such as SYSTEM, AUTH or DATABASE. Stored and
    /// transmitted under the name `type`.
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub message: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
