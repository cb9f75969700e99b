use crate::feed::FeedError;
use crate::subscriber::{self, Offer, SubscriberEntry, SubscriberId, Subscription};
use dashmap::DashMap;
use domain::{Filter, Record};
use futures::{pin_mut, Stream, StreamExt};
use log::*;

/// Queue capacity used by `Hub::default()`.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// What a single `dispatch` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Subscribers that received a copy of the record
    pub delivered: usize,
    /// Subscribers removed because their queue was full or their consumer was gone
    pub dropped: usize,
}

/// Owns the set of live subscribers and fans records out to them.
///
/// `register`, `unregister` and `dispatch` may be called concurrently from
/// different tasks. Dispatch never blocks on a subscriber: a subscriber whose
/// queue is full is removed and its queue closed, and the record is dropped for
/// that subscriber only.
pub struct Hub {
    subscribers: DashMap<SubscriberId, SubscriberEntry>,
    capacity: usize,
}

impl Hub {
    /// Creates a hub whose subscribers each buffer up to `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: DashMap::new(),
            // A zero-sized tokio channel is not allowed
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber with an empty queue. Other subscribers are unaffected.
    pub fn register(&self, filter: Filter) -> Subscription {
        let (id, entry, subscription) = subscriber::channel(filter, self.capacity);
        info!(
            "Registered subscriber {id} ({}), {} live",
            subscription.filter(),
            self.subscribers.len() + 1
        );
        self.subscribers.insert(id, entry);
        subscription
    }

    /// Remove a subscriber and close its queue.
    ///
    /// Idempotent: returns `true` only for the call that actually removed it,
    /// whether that removal races with another `unregister` or with `dispatch`
    /// dropping the subscriber.
    pub fn unregister(&self, id: &SubscriberId) -> bool {
        match self.subscribers.remove(id) {
            Some((_, entry)) => {
                entry.mark_removed();
                info!("Unregistered subscriber {id}");
                true
            }
            None => {
                debug!("Subscriber {id} already unregistered");
                false
            }
        }
    }

    /// Offer `record` to every live subscriber whose filter matches it.
    pub fn dispatch(&self, record: &Record) -> DispatchReport {
        let mut report = DispatchReport::default();

        // retain() holds each shard's write lock while its entries are visited, so
        // removing an unresponsive subscriber is atomic with respect to concurrent
        // register/unregister calls. offer() never blocks.
        self.subscribers.retain(|id, entry| match entry.offer(record) {
            Offer::Skipped => true,
            Offer::Enqueued => {
                report.delivered += 1;
                true
            }
            Offer::Full => {
                warn!(
                    "Subscriber {id} queue is full ({} records), dropping subscriber",
                    self.capacity
                );
                entry.mark_removed();
                report.dropped += 1;
                false
            }
            Offer::Closed => {
                debug!("Subscriber {id} consumer is gone, removing subscriber");
                entry.mark_removed();
                report.dropped += 1;
                false
            }
        });

        trace!(
            "Dispatched record {} to {} subscriber(s), dropped {}",
            record.id,
            report.delivered,
            report.dropped
        );
        report
    }

    /// Dispatch every record of `feed` in arrival order until it ends.
    ///
    /// Returns the feed's terminal error, if it produced one.
    pub async fn pump<S>(&self, feed: S) -> Result<(), FeedError>
    where
        S: Stream<Item = Result<Record, FeedError>>,
    {
        pin_mut!(feed);

        while let Some(next) = feed.next().await {
            let record = next?;
            self.dispatch(&record);
        }

        info!("Change feed ended");
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_registered(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}
