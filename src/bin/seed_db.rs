use log::{error, info};
use service::{config::Config, logging::Logger};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
        return ExitCode::FAILURE;
    }

    info!("Seeding database [{}]...", config.database_url());

    let db = match service::init_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Inserts fire the notify trigger, so a running server streams these too
    match entity_api::seed_database(&db).await {
        Ok(count) => {
            info!("Seeded {count} log records");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to seed log records: {e}");
            ExitCode::FAILURE
        }
    }
}
