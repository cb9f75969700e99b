//! Per-subscriber delivery loop: drains a subscription into a consumer.

use crate::hub::Hub;
use crate::subscriber::Subscription;
use async_trait::async_trait;
use domain::Record;
use log::*;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where a subscriber's records end up: an SSE response, a terminal, ...
#[async_trait]
pub trait RecordSink: Send {
    async fn deliver(&mut self, record: &Record) -> Result<(), SinkError>;
}

#[derive(Debug)]
pub enum SinkError {
    /// The consumer went away
    Disconnected,
    Io(std::io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SinkError::Disconnected => write!(f, "consumer disconnected"),
            SinkError::Io(e) => write!(f, "write failed: {e}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Disconnected => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err)
    }
}

/// Why a delivery loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEnd {
    /// The hub closed the queue and everything queued was delivered
    Closed,
    SinkFailed,
    Cancelled,
}

/// Forwards every record from `subscription` to `sink` in order until the queue
/// closes, the sink fails, or `cancel` fires.
///
/// The subscriber is always unregistered before this returns, whichever way it
/// ended, so a hub-side drop racing a consumer-side exit is harmless.
pub async fn run<S>(
    hub: Arc<Hub>,
    mut subscription: Subscription,
    mut sink: S,
    cancel: CancellationToken,
) -> DeliveryEnd
where
    S: RecordSink,
{
    let id = subscription.id();

    let end = loop {
        let record = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DeliveryEnd::Cancelled,
            record = subscription.recv() => record,
        };

        let Some(record) = record else {
            break DeliveryEnd::Closed;
        };

        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DeliveryEnd::Cancelled,
            delivered = sink.deliver(&record) => delivered,
        };

        if let Err(e) = delivered {
            debug!("Delivery to subscriber {id} failed: {e}");
            break DeliveryEnd::SinkFailed;
        }
    };

    if hub.unregister(&id) {
        debug!("Subscriber {id} left: {end:?}");
    } else {
        debug!("Subscriber {id} was already removed by the hub: {end:?}");
    }

    end
}
