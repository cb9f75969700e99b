//! The records-source capability and the operations built on it: the
//! snapshot reader used to seed a consumer's view, and record creation.

use crate::error::Error;
use crate::{Filter, Id, IntoQueryFilterMap, Record};
use async_trait::async_trait;
use entity_api::log_record as LogRecordApi;
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Number of records returned by a snapshot when the caller doesn't say otherwise.
pub const DEFAULT_SNAPSHOT_LIMIT: u64 = 100;

/// A request to append a record. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub level: String,
    pub category: String,
    pub message: String,
}

impl NewRecord {
    pub fn validate(&self) -> Result<(), Error> {
        for (field, value) in [
            ("level", &self.level),
            ("type", &self.category),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Where log records are read from and appended to.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Up to `limit` records matching `filter`, most recent first.
    async fn fetch(&self, filter: &Filter, limit: u64) -> Result<Vec<Record>, Error>;

    async fn insert(&self, record: NewRecord) -> Result<Id, Error>;
}

/// Fetches the most recent `limit` records matching `filter`, newest first.
/// Callers display them in reverse for chronological order.
pub async fn snapshot(
    store: &dyn RecordStore,
    filter: &Filter,
    limit: u64,
) -> Result<Vec<Record>, Error> {
    debug!("Fetching snapshot of at most {limit} records for filter {filter}");
    let records = store.fetch(filter, limit).await?;
    debug!("Snapshot returned {} records", records.len());
    Ok(records)
}

/// Validates and appends a new record, returning its assigned id.
pub async fn create(store: &dyn RecordStore, record: NewRecord) -> Result<Id, Error> {
    record.validate()?;
    store.insert(record).await
}

/// `RecordStore` backed by the Postgres logs table.
#[derive(Clone)]
pub struct DatabaseRecordStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseRecordStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for DatabaseRecordStore {
    async fn fetch(&self, filter: &Filter, limit: u64) -> Result<Vec<Record>, Error> {
        Ok(LogRecordApi::find_latest(&self.db, filter.into_query_filter_map(), limit).await?)
    }

    async fn insert(&self, record: NewRecord) -> Result<Id, Error> {
        let created =
            LogRecordApi::create(&self.db, record.level, record.category, record.message).await?;
        Ok(created.id)
    }
}

/// `RecordStore` kept entirely in memory. Used as the test double for the
/// live store; applies the same filter, ordering and limit semantics.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<Vec<Record>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch(&self, filter: &Filter, limit: u64) -> Result<Vec<Record>, Error> {
        let records = self.records.read().await;
        let mut matching: Vec<Record> = records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matching)
    }

    async fn insert(&self, record: NewRecord) -> Result<Id, Error> {
        let mut records = self.records.write().await;
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        records.push(Record {
            id,
            timestamp: chrono::Utc::now(),
            level: record.level,
            category: record.category,
            message: record.message,
        });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, EntityErrorKind, InternalErrorKind};
    use chrono::{Duration, TimeZone, Utc};

    fn record(id: Id, level: &str, category: &str) -> Record {
        Record {
            id,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::seconds(id),
            level: level.to_owned(),
            category: category.to_owned(),
            message: format!("record {id}"),
        }
    }

    fn new_record(level: &str, category: &str, message: &str) -> NewRecord {
        NewRecord {
            level: level.to_owned(),
            category: category.to_owned(),
            message: message.to_owned(),
        }
    }

    #[tokio::test]
    async fn snapshot_returns_only_matching_records_newest_first_within_limit() {
        let mut records = Vec::new();
        for id in 1..=250 {
            let level = if id % 2 == 0 { "ERROR" } else { "INFO" };
            records.push(record(id, level, "SYSTEM"));
        }
        let store = InMemoryRecordStore::with_records(records);
        let filter = Filter::new(Some("ERROR".to_owned()), None);

        let snapshot = snapshot(&store, &filter, DEFAULT_SNAPSHOT_LIMIT).await.unwrap();

        assert_eq!(snapshot.len(), 100);
        assert!(snapshot.iter().all(|r| r.level == "ERROR"));
        assert!(snapshot
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
        assert_eq!(snapshot.first().map(|r| r.id), Some(250));
    }

    #[tokio::test]
    async fn snapshot_of_empty_store_is_empty() {
        let store = InMemoryRecordStore::new();

        let snapshot = snapshot(&store, &Filter::all(), DEFAULT_SNAPSHOT_LIMIT).await.unwrap();

        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = InMemoryRecordStore::new();

        let first = create(&store, new_record("INFO", "SYSTEM", "up")).await.unwrap();
        let second = create(&store, new_record("INFO", "SYSTEM", "still up")).await.unwrap();

        assert!(second > first);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields_without_touching_the_store() {
        let store = InMemoryRecordStore::new();

        let err = create(&store, new_record("INFO", "  ", "hello"))
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid(
                "type must not be empty".to_owned()
            )))
        );
        assert!(store.is_empty().await);
    }
}
