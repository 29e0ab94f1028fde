//! Filtered, time-limited reaction subscriptions.
//!
//! A [`ReactionCollector`] wraps one raw gateway feed with a
//! [`ReactionFilter`] and a deadline. It yields matching reactions lazily
//! until it is closed through its [`CollectorHandle`] or the deadline passes,
//! in which case it yields [`Collected::Expired`] exactly once. Each `open`
//! creates an independent stream; collectors are never restarted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::Stream;
use reactkit_core::error::GatewayError;
use reactkit_core::filter::ReactionFilter;
use reactkit_core::gateway::{
    MessageHandle, MessagingGateway, ReactionEvent, SubscriptionId,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, trace};

/// One item of a collector's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// A reaction that passed the filter
    Matched(ReactionEvent),
    /// The deadline passed before the collector was closed
    Expired,
}

pub struct ReactionCollector {
    feed: mpsc::Receiver<ReactionEvent>,
    filter: ReactionFilter,
    deadline: Instant,
    closed: watch::Receiver<bool>,
    handle: CollectorHandle,
    finished: bool,
}

impl ReactionCollector {
    /// Subscribe to reactions on `message` matching `filter` for `ttl`.
    pub async fn open(
        gateway: Arc<dyn MessagingGateway>,
        message: &MessageHandle,
        filter: ReactionFilter,
        ttl: Duration,
    ) -> Result<Self, GatewayError> {
        Self::open_until(gateway, message, filter, deadline_after(ttl)).await
    }

    /// Like [`open`](Self::open) with an absolute deadline.
    pub async fn open_until(
        gateway: Arc<dyn MessagingGateway>,
        message: &MessageHandle,
        filter: ReactionFilter,
        deadline: Instant,
    ) -> Result<Self, GatewayError> {
        let feed = gateway.subscribe_reactions(message).await?;
        let (close_tx, close_rx) = watch::channel(false);
        debug!(message = %message.id, subscription = %feed.id, filter = ?filter, "Collector opened");

        Ok(Self {
            feed: feed.events,
            filter,
            deadline,
            closed: close_rx,
            handle: CollectorHandle {
                inner: Arc::new(HandleInner {
                    id: feed.id,
                    gateway,
                    closed: AtomicBool::new(false),
                    close_tx,
                }),
            },
            finished: false,
        })
    }

    /// A handle that can close this collector from another task.
    pub fn handle(&self) -> CollectorHandle {
        self.handle.clone()
    }

    pub fn filter(&self) -> &ReactionFilter {
        &self.filter
    }

    /// Wait for the next matching reaction.
    ///
    /// Returns `None` once the collector is closed or after `Expired` was
    /// yielded.
    pub async fn next(&mut self) -> Option<Collected> {
        if self.finished {
            return None;
        }

        loop {
            if *self.closed.borrow() {
                self.finished = true;
                return None;
            }

            tokio::select! {
                biased;

                _ = self.closed.changed() => {
                    self.finished = true;
                    return None;
                }
                _ = tokio::time::sleep_until(self.deadline) => {
                    return Some(self.expire().await);
                }
                event = self.feed.recv() => match event {
                    Some(event) if self.filter.matches(&event) => {
                        return Some(Collected::Matched(event));
                    }
                    Some(event) => {
                        trace!(emoji = %event.emoji, user = %event.user.id, "Reaction filtered out");
                    }
                    None => {
                        // Gateway dropped the feed; nothing more will ever arrive.
                        debug!(subscription = %self.handle.id(), "Reaction feed ended");
                        return Some(self.expire().await);
                    }
                },
            }
        }
    }

    async fn expire(&mut self) -> Collected {
        self.finished = true;
        self.handle.close().await;
        debug!(subscription = %self.handle.id(), "Collector expired");
        Collected::Expired
    }

    /// Expose the collector as a `futures::Stream`.
    pub fn into_stream(self) -> impl Stream<Item = Collected> + Send {
        futures::stream::unfold(self, |mut collector| async move {
            collector.next().await.map(|item| (item, collector))
        })
    }
}

/// Deadline `ttl` from now. Lifetimes too long to represent never expire.
pub(crate) fn deadline_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl).unwrap_or_else(|| now + FAR_FUTURE)
}

// Roughly thirty years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Closes a collector and releases its gateway subscription.
#[derive(Clone)]
pub struct CollectorHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    id: SubscriptionId,
    gateway: Arc<dyn MessagingGateway>,
    closed: AtomicBool,
    close_tx: watch::Sender<bool>,
}

impl CollectorHandle {
    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Stop delivery and unsubscribe. Safe to call any number of times.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.close_tx.send_replace(true);
        self.inner.gateway.unsubscribe(self.inner.id).await;
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // Dropped without close: release the subscription in the background.
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let gateway = self.gateway.clone();
            let id = self.id;
            runtime.spawn(async move { gateway.unsubscribe(id).await });
        }
    }
}
