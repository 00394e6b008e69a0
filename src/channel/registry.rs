//! Subscriber registry and early-message buffer for one event kind.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use super::EventKind;

/// Handle identifying one subscriber registration within its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Shared handle to a [`Channel`].
///
/// Each machine channel is its own lock so publishers and waiters on
/// different kinds never contend. Mutation always completes synchronously
/// within the critical section; nothing is held across an await.
pub type ChannelRef<T> = Arc<Mutex<Channel<T>>>;

struct SubscriberEntry<T> {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<T>,
}

/// One event kind's subscriber list plus its early-message buffer.
pub struct Channel<T> {
    kind: EventKind,
    subscribers: Vec<SubscriberEntry<T>>,
    buffer: VecDeque<T>,
    next_id: u64,
}

impl<T> Channel<T> {
    /// Create an empty channel for the given kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            subscribers: Vec::new(),
            buffer: VecDeque::new(),
            next_id: 0,
        }
    }

    /// Create an empty shared channel.
    pub fn shared(kind: EventKind) -> ChannelRef<T> {
        Arc::new(Mutex::new(Self::new(kind)))
    }

    /// Channel kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove one subscriber registration. Unknown handles are a no-op.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|entry| entry.id != id);
    }

    /// Drop every subscriber and discard the buffer.
    pub fn clear(&mut self) {
        self.subscribers.clear();
        self.buffer.clear();
    }

    /// Number of live subscriber registrations.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Number of messages waiting for a first subscriber.
    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }
}

impl<T: Clone> Channel<T> {
    /// Publish a message to every live subscriber, in registration order.
    ///
    /// With no live subscriber the message is buffered instead; the buffer
    /// is flushed, then discarded, by the first subsequent [`subscribe`].
    /// Subscribers whose receiving side has gone away are pruned here, and
    /// a message that reached only dead receivers is buffered too.
    ///
    /// [`subscribe`]: Channel::subscribe
    pub fn publish(&mut self, message: T) {
        if !self.subscribers.is_empty() {
            self.subscribers
                .retain(|entry| entry.tx.send(message.clone()).is_ok());
            if !self.subscribers.is_empty() {
                return;
            }
            // Every registered receiver was already closed; fall through
            // and buffer as if nobody had subscribed.
        }
        tracing::trace!(kind = %self.kind, buffered = self.buffer.len() + 1, "buffering early message");
        self.buffer.push_back(message);
    }

    /// Register a subscriber, flushing any buffered messages to it first.
    ///
    /// Buffered messages are queued on the returned receiver in original
    /// arrival order, ahead of anything published afterwards. Duplicate
    /// registrations are legal and each receive independently.
    pub fn subscribe(&mut self) -> (SubscriberId, mpsc::UnboundedReceiver<T>) {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        for buffered in self.buffer.drain(..) {
            // The receiver is still in scope, send cannot fail here.
            let _ = tx.send(buffered);
        }
        self.subscribers.push(SubscriberEntry { id, tx });
        (id, rx)
    }
}

/// A live registration on a channel.
///
/// Dropping the subscription unsubscribes it. Messages already queued when
/// the subscription is dropped are discarded with it, never re-buffered.
pub struct Subscription<T> {
    channel: ChannelRef<T>,
    id: SubscriberId,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Attach a new subscription to the given channel.
    pub fn attach(channel: &ChannelRef<T>) -> Self {
        let (id, rx) = lock(channel).subscribe();
        Self {
            channel: Arc::clone(channel),
            id,
            rx,
        }
    }

    /// Registration handle within the channel.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the channel side has been cleared (for the
    /// inbound channel this happens on abort).
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Receive without waiting, if a message is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        lock(&self.channel).unsubscribe(self.id);
    }
}

/// Lock a channel, recovering from poisoning.
///
/// A panic inside a critical section leaves only per-channel bookkeeping
/// behind; continuing with the recovered guard is always safe here.
pub(crate) fn lock<T>(channel: &ChannelRef<T>) -> std::sync::MutexGuard<'_, Channel<T>> {
    channel.lock().unwrap_or_else(PoisonError::into_inner)
}
