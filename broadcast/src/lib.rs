//! In-process fan-out of log records to independently filtered consumers.
//!
//! # Architecture
//!
//! - **Change feed**: a single ordered stream of records decoded from the
//!   store's insert notifications (`feed`).
//! - **Hub**: owns the set of live subscribers and copies every record into
//!   the bounded queue of each subscriber whose filter matches (`hub`).
//! - **Subscriber**: a bounded FIFO queue plus a filter. A subscriber whose
//!   queue is full when a record arrives is dropped rather than allowed to
//!   stall dispatch for everyone else (`subscriber`).
//! - **Delivery loop**: one task per subscriber draining its queue into a
//!   sink, such as an SSE response or a terminal (`delivery`).
//!
//! # Message Flow
//!
//! 1. A row is inserted into the logs table; a trigger publishes it as JSON
//! 2. `ChangeFeed` decodes the payload into a `Record`
//! 3. `Hub::pump` calls `Hub::dispatch` for every record in arrival order
//! 4. Each matching subscriber gets a copy via a non-blocking enqueue
//! 5. The subscriber's delivery loop forwards it to its consumer
//!
//! Delivery is best effort: a consumer that disconnects or falls behind
//! simply stops receiving records.

pub mod delivery;
pub mod feed;
pub mod hub;
pub mod subscriber;

pub use delivery::{DeliveryEnd, RecordSink, SinkError};
pub use feed::{
    decode_notification, ChangeFeed, DecodeError, FeedError, FeedErrorKind, FeedSettings,
    NotificationSource, PgNotificationSource, NOTIFY_CHANNEL,
};
pub use hub::{DispatchReport, Hub, DEFAULT_QUEUE_CAPACITY};
pub use subscriber::{SubscriberId, Subscription};
