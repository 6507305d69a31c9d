//! Tracked entries and the recompute (diff) algorithm.
//!
//! One [`Entry`] exists per `(producer, scope)` pair. Producers replace an
//! entry's pending snapshot with `set`; `recompute` diffs every pending
//! snapshot against what was last published for that entry and folds all
//! entries into a single [`Difference`].
//!
//! Published messages are `Arc`s. A message whose identity key survives a
//! snapshot change keeps its original allocation, so anything a consumer
//! attached to it by pointer stays attached.

use std::collections::hash_map::Entry as MapEntry;
use std::collections::{HashMap, HashSet};
use std::mem;
use std::sync::Arc;

use linthub_types::{Difference, Message, MessageKey, Producer, Scope};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey<P, S> {
    producer: P,
    scope: Option<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// `published` reflects the latest snapshot.
    Clean,
    /// `pending` was replaced since the last recompute.
    Dirty,
    /// Producer or scope was deleted; `published` is retracted next recompute.
    Tombstoned,
}

/// Accumulates one recompute's result before it is frozen into a
/// [`Difference`].
#[derive(Debug, Default)]
struct Changes {
    added: Vec<Arc<Message>>,
    removed: Vec<Arc<Message>>,
    current: Vec<Arc<Message>>,
}

impl Changes {
    fn into_difference(self) -> Difference {
        Difference::new(self.added, self.removed, self.current)
    }
}

#[derive(Debug)]
struct Entry {
    pending: Vec<Message>,
    published: Vec<Arc<Message>>,
    state: EntryState,
}

impl Entry {
    fn new(pending: Vec<Message>) -> Self {
        Self {
            pending,
            published: Vec::new(),
            state: EntryState::Dirty,
        }
    }

    /// Diff the pending snapshot against `published` and record the result.
    fn reconcile(&mut self, producer_name: &str, diff: &mut Changes) {
        self.state = EntryState::Clean;
        let incoming = mem::take(&mut self.pending);

        if self.published.is_empty() {
            // Nothing to diff against: everything is new.
            self.published = fill_unique(incoming, producer_name)
                .into_iter()
                .map(|(_, message)| Arc::new(message))
                .collect();
            diff.added.extend(self.published.iter().cloned());
            diff.current.extend(self.published.iter().cloned());
            return;
        }

        if incoming.is_empty() {
            diff.removed.append(&mut self.published);
            return;
        }

        let incoming = fill_unique(incoming, producer_name);
        let old_keys: HashSet<MessageKey> = self.published.iter().map(|m| key_of(m)).collect();
        let new_keys: HashSet<MessageKey> = incoming.iter().map(|(key, _)| key.clone()).collect();

        if old_keys == new_keys && incoming.len() == self.published.len() {
            // Unchanged: keep the previously published instances.
            diff.current.extend(self.published.iter().cloned());
            return;
        }

        let mut next = Vec::with_capacity(incoming.len());
        for (key, message) in incoming {
            if !old_keys.contains(&key) {
                let message = Arc::new(message);
                diff.added.push(Arc::clone(&message));
                diff.current.push(Arc::clone(&message));
                next.push(message);
            }
        }
        for message in mem::take(&mut self.published) {
            if new_keys.contains(&key_of(&message)) {
                diff.current.push(Arc::clone(&message));
                next.push(message);
            } else {
                diff.removed.push(message);
            }
        }
        self.published = next;
    }
}

/// Key of a published message. Published messages are always filled; the
/// fallback recomputes the same value.
fn key_of(message: &Message) -> MessageKey {
    message.key().cloned().unwrap_or_else(|| message.identity())
}

/// Fill every message and drop later duplicates of an identity key.
fn fill_unique(messages: Vec<Message>, producer_name: &str) -> Vec<(MessageKey, Message)> {
    let mut seen = HashSet::with_capacity(messages.len());
    let mut out = Vec::with_capacity(messages.len());
    for mut message in messages {
        let key = message.fill(producer_name).clone();
        if seen.insert(key.clone()) {
            out.push((key, message));
        } else {
            tracing::debug!(
                producer = producer_name,
                key = %key,
                "Dropping duplicate message from snapshot"
            );
        }
    }
    out
}

fn keys_unique(published: &[Arc<Message>]) -> bool {
    let mut seen = HashSet::with_capacity(published.len());
    published.iter().all(|m| seen.insert(key_of(m)))
}

/// The tracked entry set. Exclusively owned by the registry.
#[derive(Debug)]
pub(crate) struct Store<P, S> {
    entries: HashMap<EntryKey<P, S>, Entry>,
    /// `current` of the last difference that had changes.
    last_published: Vec<Arc<Message>>,
}

impl<P: Producer, S: Scope> Store<P, S> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            last_published: Vec::new(),
        }
    }

    /// Replace the pending snapshot for `(producer, scope)`, creating the
    /// entry on first use. A tombstone stays in place: the next recompute
    /// still retracts the entry and drops it, snapshot included.
    pub fn set(&mut self, producer: P, scope: Option<S>, messages: Vec<Message>) {
        match self.entries.entry(EntryKey { producer, scope }) {
            MapEntry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.pending = messages;
                if entry.state != EntryState::Tombstoned {
                    entry.state = EntryState::Dirty;
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry::new(messages));
            }
        }
    }

    /// Tombstone every entry scoped to `scope`. Returns how many entries
    /// were newly tombstoned.
    pub fn delete_by_scope(&mut self, scope: &S) -> usize {
        self.tombstone_where(|key| key.scope.as_ref() == Some(scope))
    }

    /// Tombstone every entry of `producer`, scoped or not.
    pub fn delete_by_producer(&mut self, producer: &P) -> usize {
        self.tombstone_where(|key| &key.producer == producer)
    }

    fn tombstone_where(&mut self, matches: impl Fn(&EntryKey<P, S>) -> bool) -> usize {
        let mut count = 0;
        for (key, entry) in &mut self.entries {
            if matches(key) && entry.state != EntryState::Tombstoned {
                entry.state = EntryState::Tombstoned;
                count += 1;
            }
        }
        count
    }

    pub fn contains(&self, producer: &P, scope: Option<&S>) -> bool {
        let key = EntryKey {
            producer: producer.clone(),
            scope: scope.cloned(),
        };
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn last_published(&self) -> &[Arc<Message>] {
        &self.last_published
    }

    /// Fold every entry into one difference.
    ///
    /// Tombstoned entries are retracted and dropped from the tracked set,
    /// clean entries contribute their published messages unchanged, dirty
    /// entries are diffed. Entry order is unspecified.
    pub fn recompute(&mut self) -> Difference {
        let mut changes = Changes::default();
        self.entries.retain(|key, entry| match entry.state {
            EntryState::Tombstoned => {
                changes.removed.append(&mut entry.published);
                false
            }
            EntryState::Clean => {
                changes.current.extend(entry.published.iter().cloned());
                true
            }
            EntryState::Dirty => {
                entry.reconcile(key.producer.name(), &mut changes);
                debug_assert!(
                    keys_unique(&entry.published),
                    "duplicate identity keys in published set of producer {}",
                    key.producer.name()
                );
                true
            }
        });

        let diff = changes.into_difference();
        if diff.has_changes() {
            self.last_published = diff.current().to_vec();
        }
        diff
    }
}
