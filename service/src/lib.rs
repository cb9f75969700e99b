use broadcast::Hub;
use config::Config;
use domain::log_record::RecordStore;
use log::info;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod logging;

/// Postgres schema holding the logs table.
pub const SCHEMA: &str = "log_relay";

pub async fn init_database(config: &Config) -> Result<DatabaseConnection, DbErr> {
    info!(
        "Database pool config: max_connections={}, min_connections={}, \
         connect_timeout={}s, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
        config.db_max_connections,
        config.db_min_connections,
        config.db_connect_timeout_secs,
        config.db_acquire_timeout_secs,
        config.db_idle_timeout_secs,
        config.db_max_lifetime_secs,
    );

    let mut opt = ConnectOptions::new::<&str>(config.database_url());
    opt.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_secs))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug)
        .set_schema_search_path(SCHEMA);

    let db = Database::connect(opt).await?;

    // The search path is useless until the schema exists, and the migrator's own
    // bookkeeping table is created there before any migration runs.
    db.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS {SCHEMA};"))
        .await?;

    Ok(db)
}

// Everything a request handler needs: the pipeline's hub, the records source
// and the process-wide shutdown token. Cheap to clone into the Router.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hub: Arc<Hub>,
    pub record_store: Arc<dyn RecordStore>,
    /// Cancelled when the server begins shutting down; ends live streams.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        app_config: Config,
        hub: &Arc<Hub>,
        record_store: Arc<dyn RecordStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config: app_config,
            hub: Arc::clone(hub),
            record_store,
            shutdown,
        }
    }

    pub fn record_store_ref(&self) -> &dyn RecordStore {
        self.record_store.as_ref()
    }
}

/// Completes on Ctrl-C, or on SIGTERM where supported.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
