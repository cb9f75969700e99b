use sea_orm_migration::prelude::*;

/// Channel every inserted log row is published to.
pub const LOG_NOTIFY_CHANNEL: &str = "log_channel";

fn notify_function_sql() -> String {
    format!(
        r#"
        CREATE OR REPLACE FUNCTION log_relay.notify_log_insert() RETURNS trigger AS $$
        BEGIN
            PERFORM pg_notify('{LOG_NOTIFY_CHANNEL}', row_to_json(NEW)::text);
            RETURN NEW;
        END;
        $$ LANGUAGE plpgsql;
    "#
    )
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Publish every inserted row, as JSON, to listeners on LOG_NOTIFY_CHANNEL
        manager
            .get_connection()
            .execute_unprepared(&notify_function_sql())
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS logs_notify_insert ON log_relay.logs;
                CREATE TRIGGER logs_notify_insert
                    AFTER INSERT ON log_relay.logs
                    FOR EACH ROW EXECUTE FUNCTION log_relay.notify_log_insert();
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TRIGGER IF EXISTS logs_notify_insert ON log_relay.logs;
                DROP FUNCTION IF EXISTS log_relay.notify_log_insert();
            "#,
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_function_notifies_the_log_channel() {
        let sql = notify_function_sql();

        assert!(sql.contains("pg_notify('log_channel', row_to_json(NEW)::text)"));
    }
}
