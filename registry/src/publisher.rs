//! Subscription channel for published differences.
//!
//! The publisher is an explicit observer list owned by the registry. Each
//! broadcast hands every subscriber the same `Arc<Difference>`. A subscriber
//! that panics is logged and skipped; the others still receive the
//! difference and the channel stays usable.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use linthub_types::Difference;

type Callback = Arc<dyn Fn(Arc<Difference>) + Send + Sync>;

/// Identifies one registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

enum Channel {
    Open {
        next_id: u64,
        subscribers: BTreeMap<SubscriptionId, Callback>,
    },
    Disposed,
}

/// Handle returned by [`Publisher::subscribe`].
///
/// Unsubscribing consumes the handle, so it can happen at most once.
/// Dropping the handle without unsubscribing leaves the callback registered.
#[must_use = "dropping a Subscription keeps the callback registered"]
pub struct Subscription {
    id: SubscriptionId,
    channel: Weak<Mutex<Channel>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the callback. Returns `false` if the channel was already
    /// disposed (or dropped) and the callback was gone anyway.
    pub fn unsubscribe(self) -> bool {
        let Some(channel) = self.channel.upgrade() else {
            return false;
        };
        let mut channel = channel.lock().unwrap_or_else(PoisonError::into_inner);
        match &mut *channel {
            Channel::Open { subscribers, .. } => subscribers.remove(&self.id).is_some(),
            Channel::Disposed => false,
        }
    }
}

pub(crate) struct Publisher {
    channel: Arc<Mutex<Channel>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self {
            channel: Arc::new(Mutex::new(Channel::Open {
                next_id: 0,
                subscribers: BTreeMap::new(),
            })),
        }
    }

    /// Register a callback. On a disposed channel the callback is dropped
    /// immediately and the returned handle is inert.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Difference>) + Send + Sync + 'static,
    {
        let mut channel = self.lock();
        let id = match &mut *channel {
            Channel::Open {
                next_id,
                subscribers,
            } => {
                let id = SubscriptionId(*next_id);
                *next_id += 1;
                subscribers.insert(id, Arc::new(callback));
                id
            }
            Channel::Disposed => {
                tracing::debug!("Subscribe on disposed publisher ignored");
                SubscriptionId(u64::MAX)
            }
        };
        Subscription {
            id,
            channel: Arc::downgrade(&self.channel),
        }
    }

    /// Deliver `difference` to every subscriber. Returns how many callbacks
    /// completed without panicking.
    ///
    /// Callbacks run outside the channel lock, so a callback may subscribe or
    /// unsubscribe without deadlocking; such changes apply from the next
    /// broadcast.
    pub fn broadcast(&self, difference: Difference) -> usize {
        let callbacks: Vec<(SubscriptionId, Callback)> = match &*self.lock() {
            Channel::Open { subscribers, .. } => subscribers
                .iter()
                .map(|(id, cb)| (*id, Arc::clone(cb)))
                .collect(),
            Channel::Disposed => return 0,
        };

        let difference = Arc::new(difference);
        let mut delivered = 0;
        for (id, callback) in callbacks {
            let shared = Arc::clone(&difference);
            match panic::catch_unwind(AssertUnwindSafe(|| callback(shared))) {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        subscription = %id,
                        panic = %panic_payload_to_string(&payload),
                        "Subscriber panicked during broadcast"
                    );
                }
            }
        }
        delivered
    }

    /// Drop every subscriber and close the channel. Later broadcasts are
    /// silently dropped.
    pub fn dispose_all(&self) {
        let previous = mem::replace(&mut *self.lock(), Channel::Disposed);
        if let Channel::Open { subscribers, .. } = previous {
            tracing::debug!(count = subscribers.len(), "Publisher disposed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Channel> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_payload_to_string(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
