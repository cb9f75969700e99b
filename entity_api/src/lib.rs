use log::*;

pub use entity::{log_records, Id};

pub mod error;
pub mod log_record;
pub mod query;

/// Sample records used to populate a fresh development database.
const SEED_RECORDS: &[(&str, &str, &str)] = &[
    ("INFO", "SYSTEM", "System started"),
    ("DEBUG", "API", "GET /api/logs served in 3ms"),
    ("INFO", "AUTH", "User admin logged in"),
    ("WARNING", "DATABASE", "Slow query detected (1250ms)"),
    ("ERROR", "DATABASE", "Connection failed"),
    ("INFO", "USER", "Profile updated for user 42"),
    ("WARNING", "AUTH", "Three failed login attempts for user guest"),
    ("ERROR", "API", "Upstream returned 502"),
];

pub async fn seed_database(db: &sea_orm::DatabaseConnection) -> Result<usize, error::Error> {
    for (level, category, message) in SEED_RECORDS {
        let record = log_record::create(
            db,
            (*level).to_owned(),
            (*category).to_owned(),
            (*message).to_owned(),
        )
        .await?;
        debug!("Seeded log record {}", record.id);
    }

    info!("Seeded {} log records", SEED_RECORDS.len());
    Ok(SEED_RECORDS.len())
}
