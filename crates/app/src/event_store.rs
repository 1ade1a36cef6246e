//! In-process event stores — current value, stats and subscribers per topic.
//!
//! Two stores exist for the lifetime of the process:
//! - **Settings**, durable: every write is persisted before `publish` returns
//!   and always notifies subscribers.
//! - **Session**, ephemeral: memory-only; writes that carry no news are
//!   recorded but not fanned out (see [`SignificanceFilter`]).
//!
//! Both serialise mutation under one mutex guarding values, stats and the
//! subscriber registry together. A durable store additionally holds an
//! async lock from recording a write until it is saved, so storage sees
//! writes in the same order as memory. Fan-out happens on a spawned task so a
//! publisher never waits on a consumer; each subscriber gets at most
//! [`FANOUT_TIMEOUT`] to accept a message before the task moves on.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use carhub_domain::error::CarHubError;
use carhub_domain::gps::{LAT_TOPIC, LNG_TOPIC};
use carhub_domain::message::Message;
use carhub_domain::significance::{Candidate, SignificanceFilter, Verdict};
use carhub_domain::stats::TopicStats;
use carhub_domain::time::now;
use carhub_domain::topic::Topic;
use carhub_domain::value::Value;

use crate::mailbox::Mailbox;
use crate::ports::{Ephemeral, Persistence};

/// Longest a single subscriber may block a fan-out.
pub const FANOUT_TIMEOUT: Duration = Duration::from_secs(2);

/// The ephemeral Session store.
pub type SessionStore = EventStore<Ephemeral>;

#[derive(Default)]
struct Inner {
    current: HashMap<Topic, Value>,
    stats: HashMap<Topic, TopicStats>,
    subscribers: HashMap<Topic, Vec<Mailbox>>,
}

impl Inner {
    /// Exact-topic subscribers first, then wildcard subscribers.
    ///
    /// Mailboxes whose consumer is gone are dropped from the registry.
    fn targets(&mut self, topic: &Topic) -> Vec<Mailbox> {
        let wildcard = Topic::wildcard();
        let mut targets = Vec::new();
        for key in [topic, &wildcard] {
            if let Some(mailboxes) = self.subscribers.get_mut(key) {
                mailboxes.retain(|mailbox| !mailbox.is_closed());
                targets.extend(mailboxes.iter().cloned());
            }
        }
        targets
    }
}

/// A key/value store with publish/subscribe semantics.
pub struct EventStore<P> {
    name: &'static str,
    persistence: P,
    filter: SignificanceFilter,
    fanout_timeout: Duration,
    inner: Mutex<Inner>,
    durable_writes: tokio::sync::Mutex<()>,
}

impl EventStore<Ephemeral> {
    /// Create the memory-only Session store.
    #[must_use]
    pub fn session() -> Self {
        Self::new("session", Ephemeral)
    }
}

impl<P: Persistence> EventStore<P> {
    /// Create the durable Settings store backed by `persistence`.
    #[must_use]
    pub fn settings(persistence: P) -> Self {
        Self::new("settings", persistence)
    }

    /// Create a store with an explicit name and persistence.
    #[must_use]
    pub fn new(name: &'static str, persistence: P) -> Self {
        Self {
            name,
            persistence,
            filter: SignificanceFilter::default(),
            fanout_timeout: FANOUT_TIMEOUT,
            inner: Mutex::new(Inner::default()),
            durable_writes: tokio::sync::Mutex::new(()),
        }
    }

    /// Override the per-subscriber fan-out timeout.
    #[must_use]
    pub fn with_fanout_timeout(mut self, timeout: Duration) -> Self {
        self.fanout_timeout = timeout;
        self
    }

    /// Override the significance policy of an ephemeral store.
    #[must_use]
    pub fn with_filter(mut self, filter: SignificanceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Name used in logs (`settings` or `session`).
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new value for `topic` and notify subscribers if warranted.
    ///
    /// The value and stats are always recorded. A durable store persists
    /// the write before returning; a failure is logged and the in-memory
    /// value stays authoritative. Returns the significance verdict, which
    /// is always [`Verdict::Notify`] for a durable store.
    pub async fn publish(&self, topic: impl Into<Topic>, value: impl Into<Value>) -> Verdict {
        let topic = topic.into();
        let value = value.into();
        let durable = self.persistence.is_durable();
        let _ordered = if durable {
            Some(self.durable_writes.lock().await)
        } else {
            None
        };

        let (verdict, targets) = {
            let mut inner = self.lock();
            let at = now();
            let previous = inner.stats.get(&topic).map(|s| s.write_date);
            let verdict = if durable {
                Verdict::Notify
            } else {
                self.filter.evaluate(&Candidate {
                    topic: &topic,
                    old: inner.current.get(&topic),
                    new: &value,
                    previous_write: previous,
                    lat: inner.current.get(LAT_TOPIC),
                    lng: inner.current.get(LNG_TOPIC),
                    now: at,
                })
            };

            inner.current.insert(topic.clone(), value.clone());
            inner
                .stats
                .entry(topic.clone())
                .and_modify(|s| s.record(at))
                .or_insert_with(|| TopicStats::first(at));

            let targets = if verdict.should_notify() {
                inner.targets(&topic)
            } else {
                Vec::new()
            };
            (verdict, targets)
        };

        if durable {
            if let Err(err) = self.persistence.save(&topic, &value).await {
                tracing::error!(store = self.name, %topic, error = %err, "failed to persist write");
            }
        }

        match verdict {
            Verdict::Notify => self.dispatch(targets, Message::new(topic, value)),
            Verdict::Unchanged => {
                tracing::trace!(store = self.name, %topic, "value unchanged, not notifying");
            }
            Verdict::Insignificant { distance_km } => {
                tracing::debug!(store = self.name, %topic, distance_km, "gps moved too little, not notifying");
            }
            Verdict::Unparsable => {
                tracing::error!(store = self.name, %topic, %value, "failed to compare gps points");
            }
        }
        verdict
    }

    /// Register `mailbox` for `topic`, or for every topic with `"*"`.
    ///
    /// Registrations are not deduplicated.
    pub fn subscribe(&self, topic: impl Into<Topic>, mailbox: Mailbox) {
        let topic = topic.into();
        tracing::debug!(store = self.name, %topic, "new subscriber");
        let mut inner = self.lock();
        let mailboxes = inner.subscribers.entry(topic).or_default();
        mailboxes.retain(|mailbox| !mailbox.is_closed());
        mailboxes.push(mailbox);
    }

    /// Number of registered mailboxes across all topics.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.values().map(Vec::len).sum()
    }

    /// Current value of `topic`, if it was ever written.
    #[must_use]
    pub fn get(&self, topic: impl Into<Topic>) -> Option<Value> {
        let topic: Topic = topic.into();
        self.lock().current.get(&topic).cloned()
    }

    /// Boolean reading of `topic`; `false` when unset.
    #[must_use]
    pub fn get_bool(&self, topic: impl Into<Topic>) -> bool {
        self.get(topic).is_some_and(|v| v.as_bool())
    }

    /// String reading of `topic`; empty when unset.
    #[must_use]
    pub fn get_string(&self, topic: impl Into<Topic>) -> String {
        self.get(topic).map(|v| v.to_string()).unwrap_or_default()
    }

    /// Whether `topic` holds a value.
    #[must_use]
    pub fn is_set(&self, topic: impl Into<Topic>) -> bool {
        let topic: Topic = topic.into();
        self.lock().current.contains_key(&topic)
    }

    /// All current values, ordered by topic.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<Topic, Value> {
        self.lock()
            .current
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Write statistics of `topic`.
    #[must_use]
    pub fn stats(&self, topic: impl Into<Topic>) -> Option<TopicStats> {
        let topic: Topic = topic.into();
        self.lock().stats.get(&topic).copied()
    }

    /// Write statistics of every topic, ordered by topic.
    #[must_use]
    pub fn all_stats(&self) -> BTreeMap<Topic, TopicStats> {
        self.lock()
            .stats
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Seed current values without persisting or notifying.
    pub fn load(&self, entries: impl IntoIterator<Item = (Topic, Value)>) {
        let mut inner = self.lock();
        for (topic, value) in entries {
            inner.current.insert(topic, value);
        }
    }

    /// Load every persisted value into memory; returns how many were loaded.
    ///
    /// # Errors
    ///
    /// Returns the persistence error if loading fails.
    pub async fn restore(&self) -> Result<usize, CarHubError> {
        let entries = self.persistence.load_all().await?;
        let count = entries.len();
        self.load(entries);
        tracing::info!(store = self.name, count, "restored persisted values");
        Ok(count)
    }

    /// Re-deliver every known topic to its subscribers.
    ///
    /// Run once after wiring so consumers that subscribed late see the
    /// loaded configuration.
    pub fn flush(&self) {
        let deliveries: Vec<(Vec<Mailbox>, Message)> = {
            let mut inner = self.lock();
            let entries: Vec<(Topic, Value)> = inner
                .current
                .iter()
                .map(|(topic, value)| (topic.clone(), value.clone()))
                .collect();
            entries
                .into_iter()
                .map(|(topic, value)| (inner.targets(&topic), Message::new(topic, value)))
                .collect()
        };
        tracing::debug!(store = self.name, topics = deliveries.len(), "flushing");
        for (targets, message) in deliveries {
            self.dispatch(targets, message);
        }
    }

    fn dispatch(&self, targets: Vec<Mailbox>, message: Message) {
        if targets.is_empty() {
            return;
        }
        let store = self.name;
        let timeout = self.fanout_timeout;
        tokio::spawn(async move {
            for mailbox in targets {
                match tokio::time::timeout(timeout, mailbox.send(message.clone())).await {
                    Ok(Ok(())) => {}
                    Ok(Err(_)) => {
                        tracing::debug!(store, topic = %message.topic, "subscriber dropped its mailbox");
                    }
                    Err(_) => {
                        tracing::error!(
                            store,
                            topic = %message.topic,
                            "subscriber took too long to consume message, moving on"
                        );
                    }
                }
            }
        });
    }
}
