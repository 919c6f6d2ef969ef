//! Live push hub.
//!
//! Topic-keyed registry of bounded channels. Each SSE connection holds one
//! [`Subscription`] registered under several topics; dropping it removes it
//! from the registry. Pushes are best effort: a full channel is given a short
//! grace period, a closed one is pruned.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::models::auth::Role;
use crate::models::notification::LiveMessage;

/// Per-send push timeout.
pub const PUSH_TIMEOUT: Duration = Duration::from_millis(500);

/// Default per-subscription buffer.
const DEFAULT_CAPACITY: usize = 32;

/// Named push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    User(i64),
    Role(Role),
    Course(i64),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Role(role) => write!(f, "role:{role}"),
            Topic::Course(id) => write!(f, "course:{id}"),
        }
    }
}

type Subscribers = Vec<(u64, mpsc::Sender<LiveMessage>)>;

struct Inner {
    topics: DashMap<Topic, Subscribers>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Concurrent topic registry. Cheap to clone.
#[derive(Clone)]
pub struct LiveHub {
    inner: Arc<Inner>,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Hub whose subscriptions buffer at most `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: DashMap::new(),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Register one receiver under every given topic.
    pub fn subscribe(&self, topics: Vec<Topic>) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        for topic in &topics {
            self.inner
                .topics
                .entry(*topic)
                .or_default()
                .push((id, tx.clone()));
        }
        debug!(subscription = id, topics = topics.len(), "live subscription opened");
        Subscription {
            id,
            topics,
            receiver: rx,
            hub: self.clone(),
        }
    }

    /// Push `message` to every subscriber of `topic`. Returns how many
    /// subscribers accepted it.
    pub async fn publish(&self, topic: Topic, message: &LiveMessage) -> usize {
        let senders: Subscribers = match self.inner.topics.get(&topic) {
            Some(entry) => entry.value().clone(),
            None => return 0,
        };

        let sends = senders.iter().map(|(id, tx)| async move {
            match tokio::time::timeout(PUSH_TIMEOUT, tx.send(message.clone())).await {
                Ok(Ok(())) => (*id, Delivery::Sent),
                Ok(Err(_)) => (*id, Delivery::Closed),
                Err(_) => (*id, Delivery::TimedOut),
            }
        });
        let results = join_all(sends).await;

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, outcome) in results {
            match outcome {
                Delivery::Sent => delivered += 1,
                Delivery::Closed => closed.push(id),
                Delivery::TimedOut => {
                    warn!(%topic, subscription = id, "live push timed out");
                }
            }
        }
        if !closed.is_empty() {
            self.prune(topic, |id| closed.contains(&id));
        }
        delivered
    }

    /// Number of live subscriptions on a topic.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner.topics.get(&topic).map_or(0, |entry| entry.len())
    }

    fn prune(&self, topic: Topic, remove: impl Fn(u64) -> bool) {
        if let Some(mut entry) = self.inner.topics.get_mut(&topic) {
            entry.retain(|(id, _)| !remove(*id));
        }
        self.inner.topics.remove_if(&topic, |_, subs| subs.is_empty());
    }
}

enum Delivery {
    Sent,
    Closed,
    TimedOut,
}

/// Receiving end of a live connection.
pub struct Subscription {
    id: u64,
    topics: Vec<Topic>,
    receiver: mpsc::Receiver<LiveMessage>,
    hub: LiveHub,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<LiveMessage> {
        self.receiver.recv().await
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for topic in &self.topics {
            self.hub.prune(*topic, |id| id == self.id);
        }
        debug!(subscription = self.id, "live subscription closed");
    }
}
