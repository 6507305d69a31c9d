//! MessageRegistry facade: the public API producers and consumers use.
//!
//! Producers call [`MessageRegistry::set`] with full snapshots and the
//! `delete_*` operations when a producer or a document goes away. None of
//! these recompute anything on the caller; they mutate the tracked set under
//! its lock and poke the debouncer. The debounce task recomputes and, when
//! something was added or removed, broadcasts one [`Difference`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use linthub_types::{Difference, Message, Producer, RegistrySettings, Scope};

use crate::debounce::Debouncer;
use crate::publisher::{Publisher, Subscription};
use crate::store::Store;

struct Shared<P, S> {
    store: Mutex<Store<P, S>>,
    publisher: Publisher,
}

impl<P: Producer, S: Scope> Shared<P, S> {
    fn store(&self) -> MutexGuard<'_, Store<P, S>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One recompute cycle. The store lock is released before subscribers
    /// run, so a subscriber may call back into the registry.
    fn update(&self) {
        let diff = {
            let mut store = self.store();
            let diff = store.recompute();
            tracing::debug!(
                entries = store.len(),
                added = diff.added().len(),
                removed = diff.removed().len(),
                current = diff.current().len(),
                "Messages recomputed"
            );
            diff
        };
        if diff.has_changes() {
            let delivered = self.publisher.broadcast(diff);
            tracing::trace!(delivered, "Difference broadcast");
        }
    }
}

/// Aggregates message snapshots from many producers and publishes one
/// coalesced [`Difference`] per debounce cycle.
///
/// Entries are keyed by `(producer, scope)`; `None` scope means the snapshot
/// is producer-wide rather than tied to a document.
pub struct MessageRegistry<P: Producer, S: Scope> {
    shared: Arc<Shared<P, S>>,
    debouncer: Debouncer,
}

impl<P: Producer, S: Scope> MessageRegistry<P, S> {
    /// Create a registry and spawn its debounce task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(settings: &RegistrySettings) -> Self {
        let shared = Arc::new(Shared {
            store: Mutex::new(Store::new()),
            publisher: Publisher::new(),
        });
        let task_shared = Arc::clone(&shared);
        let debouncer = Debouncer::spawn(settings.debounce_window(), move || {
            task_shared.update();
        });
        tracing::debug!(
            debounce_ms = settings.debounce_ms(),
            "Message registry started"
        );
        Self { shared, debouncer }
    }

    /// Replace the snapshot `producer` reports for `scope`.
    pub fn set(&self, producer: P, scope: Option<S>, messages: Vec<Message>) {
        self.shared.store().set(producer, scope, messages);
        self.debouncer.trigger();
    }

    /// Retract every snapshot tied to `scope`, from all producers.
    pub fn delete_by_scope(&self, scope: &S) {
        let count = self.shared.store().delete_by_scope(scope);
        tracing::trace!(count, "Entries tombstoned by scope");
        self.debouncer.trigger();
    }

    /// Retract every snapshot `producer` has reported, scoped or not.
    pub fn delete_by_producer(&self, producer: &P) {
        let count = self.shared.store().delete_by_producer(producer);
        tracing::trace!(producer = producer.name(), count, "Entries tombstoned by producer");
        self.debouncer.trigger();
    }

    /// Register `callback` for every broadcast difference.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Difference>) + Send + Sync + 'static,
    {
        self.shared.publisher.subscribe(callback)
    }

    /// The `current` list of the most recent broadcast.
    #[must_use]
    pub fn messages(&self) -> Vec<Arc<Message>> {
        self.shared.store().last_published().to_vec()
    }

    /// Whether an entry for `(producer, scope)` is tracked right now.
    #[must_use]
    pub fn contains(&self, producer: &P, scope: Option<&S>) -> bool {
        self.shared.store().contains(producer, scope)
    }

    /// Number of tracked `(producer, scope)` entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.shared.store().len()
    }

    /// Cancel any scheduled recompute and close the subscription channel.
    ///
    /// Idempotent. Mutations after disposal are accepted but never published.
    pub fn dispose(&self) {
        self.debouncer.cancel();
        self.shared.publisher.dispose_all();
    }
}
