pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_schema_and_logs_table;
mod m20250301_000002_add_log_insert_notify_trigger;

pub use m20250301_000002_add_log_insert_notify_trigger::LOG_NOTIFY_CHANNEL;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_schema_and_logs_table::Migration),
            Box::new(m20250301_000002_add_log_insert_notify_trigger::Migration),
        ]
    }
}
