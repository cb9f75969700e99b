use async_trait::async_trait;
use axum::response::sse::Event;
use broadcast::{RecordSink, SinkError};
use domain::Record;
use log::*;
use tokio::sync::mpsc;

/// Feeds a subscriber's records into an SSE response body as `data: <json>` frames.
pub(crate) struct ChannelSink {
    events: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub(crate) fn new(events: mpsc::Sender<Event>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl RecordSink for ChannelSink {
    async fn deliver(&mut self, record: &Record) -> Result<(), SinkError> {
        let data = match serde_json::to_string(record) {
            Ok(data) => data,
            Err(e) => {
                warn!("Skipping log record {} that failed to serialize: {e}", record.id);
                return Ok(());
            }
        };

        self.events
            .send(Event::default().data(data))
            .await
            .map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::response::{IntoResponse, Sse};
    use chrono::{TimeZone, Utc};
    use std::convert::Infallible;

    fn record() -> Record {
        Record {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 20, 30).unwrap(),
            level: "ERROR".to_owned(),
            category: "DATABASE".to_owned(),
            message: "Connection failed".to_owned(),
        }
    }

    #[tokio::test]
    async fn forwards_each_record_as_a_json_data_frame() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);

        sink.deliver(&record()).await.unwrap();
        drop(sink);

        let event = rx.recv().await.unwrap();
        assert!(rx.recv().await.is_none());

        let events = futures::stream::iter([Ok::<_, Infallible>(event)]);
        let body = to_bytes(Sse::new(events).into_response().into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            "data: {\"id\":7,\"timestamp\":\"2024-05-01T10:20:30Z\",\"level\":\"ERROR\",\"type\":\"DATABASE\",\"message\":\"Connection failed\"}\n\n"
        );
    }

    #[tokio::test]
    async fn reports_disconnect_once_the_response_is_gone() {
        let (tx, rx) = mpsc::channel(4);
        let mut sink = ChannelSink::new(tx);
        drop(rx);

        assert!(matches!(
            sink.deliver(&record()).await,
            Err(SinkError::Disconnected)
        ));
    }
}
