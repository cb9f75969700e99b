//! Change source adapter: turns the store's insert notifications into a single
//! ordered stream of records.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use domain::{Id, Record};
use futures::Stream;
use log::*;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Postgres channel the insert trigger publishes to. Must match the channel
/// named in the `notify_log_insert` migration.
pub const NOTIFY_CHANNEL: &str = "log_channel";

#[derive(Debug)]
pub struct FeedError {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: FeedErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The initial connection or LISTEN failed
    Connect,
    /// Receiving from an established listener failed
    Transport,
    /// Consecutive transport failures exceeded the configured retries
    RetriesExhausted(u32),
}

impl FeedError {
    pub fn connect(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(err)),
            error_kind: FeedErrorKind::Connect,
        }
    }

    pub fn transport(err: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(err)),
            error_kind: FeedErrorKind::Transport,
        }
    }

    pub fn retries_exhausted(
        retries: u32,
        source: Option<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            source,
            error_kind: FeedErrorKind::RetriesExhausted(retries),
        }
    }
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            FeedErrorKind::Connect => write!(f, "failed to listen for notifications")?,
            FeedErrorKind::Transport => write!(f, "notification transport failed")?,
            FeedErrorKind::RetriesExhausted(retries) => {
                write!(f, "notification transport failed after {retries} retries")?
            }
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for FeedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// A notification payload that could not be turned into a record.
#[derive(Debug)]
pub enum DecodeError {
    Json(serde_json::Error),
    Timestamp(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Json(e) => write!(f, "invalid notification JSON: {e}"),
            DecodeError::Timestamp(t) => write!(f, "invalid notification timestamp: {t}"),
        }
    }
}

impl StdError for DecodeError {}

/// Wire shape of the insert trigger's payload (`row_to_json(NEW)`).
#[derive(Deserialize)]
struct NotificationPayload {
    id: Id,
    timestamp: String,
    level: String,
    #[serde(rename = "type")]
    category: String,
    message: String,
}

/// Decodes one notification payload into a record.
pub fn decode_notification(payload: &str) -> Result<Record, DecodeError> {
    let payload: NotificationPayload = serde_json::from_str(payload).map_err(DecodeError::Json)?;

    Ok(Record {
        id: payload.id,
        timestamp: parse_timestamp(&payload.timestamp)?,
        level: payload.level,
        category: payload.category,
        message: payload.message,
    })
}

// row_to_json renders timestamptz with an offset but plain timestamp without one.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| DecodeError::Timestamp(raw.to_owned()))
}

/// Raw notifications from the store, one payload at a time.
///
/// Implementations reconnect on their own when asked for the next payload
/// after a connection loss, returning an error only when that fails.
#[async_trait]
pub trait NotificationSource: Send {
    async fn recv(&mut self) -> Result<String, FeedError>;
}

/// `NotificationSource` over a Postgres `LISTEN` connection.
pub struct PgNotificationSource {
    listener: PgListener,
}

impl PgNotificationSource {
    pub async fn connect(database_url: &str) -> Result<Self, FeedError> {
        let mut listener = PgListener::connect(database_url)
            .await
            .map_err(FeedError::connect)?;
        listener
            .listen(NOTIFY_CHANNEL)
            .await
            .map_err(FeedError::connect)?;

        info!("Listening for log notifications on channel: {NOTIFY_CHANNEL}");
        Ok(Self { listener })
    }
}

#[async_trait]
impl NotificationSource for PgNotificationSource {
    async fn recv(&mut self) -> Result<String, FeedError> {
        let notification = self.listener.recv().await.map_err(FeedError::transport)?;
        Ok(notification.payload().to_owned())
    }
}

/// Retry policy for transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings {
    /// Consecutive failures tolerated before the feed gives up
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl FeedSettings {
    /// Exponential backoff delay before retry number `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = self.backoff_base.as_secs_f64() * 2_f64.powi(attempt.min(30) as i32);
        Duration::from_secs_f64(delay.min(self.backoff_max.as_secs_f64()))
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// The single ordered feed of records decoded from store notifications.
pub struct ChangeFeed<N> {
    source: N,
    settings: FeedSettings,
}

impl<N> ChangeFeed<N>
where
    N: NotificationSource + 'static,
{
    pub fn new(source: N, settings: FeedSettings) -> Self {
        Self { source, settings }
    }

    /// Turns the feed into a stream of records. Consumes the feed: it cannot be
    /// restarted.
    ///
    /// Malformed payloads are logged and skipped. Transport failures are retried
    /// with backoff; once more than `max_retries` happen in a row the stream
    /// yields a single `RetriesExhausted` error and ends. Cancelling `cancel`
    /// closes the upstream connection and ends the stream.
    pub fn subscribe(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Record, FeedError>> + Send + 'static {
        let ChangeFeed {
            mut source,
            settings,
        } = self;

        stream! {
            let mut failures: u32 = 0;

            loop {
                let received = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = source.recv() => received,
                };

                match received {
                    Ok(payload) => {
                        failures = 0;
                        match decode_notification(&payload) {
                            Ok(record) => yield Ok(record),
                            Err(e) => warn!("Skipping malformed log notification: {e}"),
                        }
                    }
                    Err(e) if failures >= settings.max_retries => {
                        error!("Giving up on log notifications after {failures} retries: {e}");
                        yield Err(FeedError::retries_exhausted(failures, Some(Box::new(e))));
                        break;
                    }
                    Err(e) => {
                        let delay = settings.backoff_delay(failures);
                        failures += 1;
                        warn!(
                            "Log notification transport failed ({e}), retry {failures}/{} in {delay:?}",
                            settings.max_retries
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }

            drop(source);
            info!("Log notification feed closed");
        }
    }
}
