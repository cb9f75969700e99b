use domain::{Filter, Record};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Unique identifier for a subscriber (server-generated)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Result of offering one record to a subscriber's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    /// The subscriber's filter rejected the record.
    Skipped,
    Enqueued,
    /// The queue is at capacity; the subscriber is unresponsive.
    Full,
    /// The consuming half is gone.
    Closed,
}

/// The hub's half of a subscriber: the sending end of the queue plus the filter.
/// Dropping it closes the queue.
pub(crate) struct SubscriberEntry {
    filter: Filter,
    sender: mpsc::Sender<Record>,
    alive: Arc<AtomicBool>,
}

impl SubscriberEntry {
    /// Non-blocking: never waits for room in the queue.
    pub(crate) fn offer(&self, record: &Record) -> Offer {
        if !self.filter.matches(record) {
            return Offer::Skipped;
        }

        match self.sender.try_send(record.clone()) {
            Ok(()) => Offer::Enqueued,
            Err(TrySendError::Full(_)) => Offer::Full,
            Err(TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Must be called as the entry leaves the live set.
    pub(crate) fn mark_removed(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// The consumer's half of a subscriber: the receiving end of its queue.
///
/// Records arrive in dispatch order. Once the hub removes the subscriber,
/// records already queued can still be drained, after which `recv`
/// returns `None`.
pub struct Subscription {
    id: SubscriberId,
    filter: Filter,
    receiver: mpsc::Receiver<Record>,
    alive: Arc<AtomicBool>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Whether the subscriber is still in the hub's live set.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Waits for the next record. `None` means the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Record> {
        self.receiver.recv().await
    }

    /// Takes the next record if one is already queued.
    pub fn try_recv(&mut self) -> Option<Record> {
        self.receiver.try_recv().ok()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Creates both halves of a new subscriber with a queue of `capacity` records.
pub(crate) fn channel(filter: Filter, capacity: usize) -> (SubscriberId, SubscriberEntry, Subscription) {
    let id = SubscriberId::new();
    let (sender, receiver) = mpsc::channel(capacity);
    let alive = Arc::new(AtomicBool::new(true));

    let entry = SubscriberEntry {
        filter: filter.clone(),
        sender,
        alive: Arc::clone(&alive),
    };
    let subscription = Subscription {
        id,
        filter,
        receiver,
        alive,
    };

    (id, entry, subscription)
}
