use broadcast::{ChangeFeed, Hub, PgNotificationSource};
use domain::log_record::DatabaseRecordStore;
use log::*;
use migration::{Migrator, MigratorTrait};
use service::{config::Config, logging::Logger, AppState};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        "Starting log_relay in {} mode on {}:{}",
        config.runtime_env(),
        config.interface.as_deref().unwrap_or("127.0.0.1"),
        config.port
    );

    let db = match service::init_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to apply database migrations: {e}");
        return ExitCode::FAILURE;
    }

    let source = match PgNotificationSource::connect(config.database_url()).await {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to start log listener: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let hub = Arc::new(Hub::new(config.subscriber_queue_capacity));

    let feed = ChangeFeed::new(source, config.feed_settings()).subscribe(shutdown.child_token());
    let feed_task = {
        let hub = Arc::clone(&hub);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = hub.pump(feed).await;
            if let Err(e) = &result {
                error!("Log listener failed, shutting down: {e}");
            }
            shutdown.cancel();
            result
        })
    };

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            tokio::select! {
                _ = service::shutdown_signal() => {
                    info!("Shutting down server...");
                    shutdown.cancel();
                }
                _ = shutdown.cancelled() => {}
            }
        }
    });

    let record_store = Arc::new(DatabaseRecordStore::new(Arc::new(db)));
    let app_state = AppState::new(config, &hub, record_store, shutdown.clone());

    let served = web::init_server(app_state).await;
    shutdown.cancel();

    let feed_result = feed_task.await;

    match (served, feed_result) {
        (Err(e), _) => {
            error!("Server failed: {e}");
            ExitCode::FAILURE
        }
        (Ok(()), Ok(Err(_))) => ExitCode::FAILURE,
        (Ok(()), Err(e)) => {
            error!("Log listener task panicked: {e}");
            ExitCode::FAILURE
        }
        (Ok(()), Ok(Ok(()))) => {
            info!("Server gracefully stopped");
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn listener_and_insert_trigger_share_a_channel() {
        assert_eq!(broadcast::NOTIFY_CHANNEL, migration::LOG_NOTIFY_CHANNEL);
    }
}
