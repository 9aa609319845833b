//! Feed - the entity-change feed a listener can subscribe to.
//!
//! A feed delivers three disjoint sets of changed entities (inserted,
//! deleted, updated) to each subscribed [`ChangeListener`], either on every
//! mutation or once per commit. Listeners of different concrete types are
//! held side by side as [`AnyChangeListener`] adapters.
//!
//! ## Example
//!
//! ```ignore
//! use erased_rust::feed::{AnyChangeListener, ChangeFeed, InMemoryChangeFeed, Trigger};
//!
//! let feed = InMemoryChangeFeed::<Task>::new();
//! let _subscription = feed.subscribe(
//!     |task| task.done,
//!     Trigger::OnCommit,
//!     AnyChangeListener::new(CompletedCounter::default()),
//! )?;
//!
//! feed.insert(Task::new("t-1", true))?;
//! feed.commit()?;
//! ```

mod in_memory;
mod listener;
mod subscription;

#[cfg(feature = "emitter")]
mod emitter;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use in_memory::InMemoryChangeFeed;
pub use listener::{AnyChangeListener, ChangeListener, ListenerFn};
pub use subscription::{Subscription, SubscriptionId};

#[cfg(feature = "emitter")]
pub use emitter::EmitterListener;

/// When a subscriber hears about changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    /// Once per insert, update or delete, as it happens.
    OnMutation,
    /// Once per commit, with everything staged since the last one.
    OnCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Inserted,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// The net effect of `next` following `self` on the same entity before a
    /// commit. `None` means the two cancel out.
    pub fn then(self, next: ChangeKind) -> Option<ChangeKind> {
        use ChangeKind::*;
        match (self, next) {
            (Inserted, Inserted) | (Inserted, Updated) => Some(Inserted),
            (Inserted, Deleted) => None,
            (Updated, Inserted) | (Updated, Updated) => Some(Updated),
            (Updated, Deleted) => Some(Deleted),
            (Deleted, Inserted) | (Deleted, Updated) => Some(Updated),
            (Deleted, Deleted) => Some(Deleted),
        }
    }
}

/// Entities carried by a feed. The key identifies an entity across changes.
pub trait FeedEntity: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
}

/// Entities changed by one mutation or one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet<E> {
    pub inserted: Vec<E>,
    pub deleted: Vec<E>,
    pub updated: Vec<E>,
}

impl<E> ChangeSet<E> {
    pub fn new() -> Self {
        Self {
            inserted: Vec::new(),
            deleted: Vec::new(),
            updated: Vec::new(),
        }
    }

    pub fn push(&mut self, kind: ChangeKind, entity: E) {
        match kind {
            ChangeKind::Inserted => self.inserted.push(entity),
            ChangeKind::Updated => self.updated.push(entity),
            ChangeKind::Deleted => self.deleted.push(entity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty() && self.updated.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.deleted.len() + self.updated.len()
    }

    /// The entities matching `filter`, keeping each in its set.
    pub fn filtered(&self, filter: impl Fn(&E) -> bool) -> ChangeSet<E>
    where
        E: Clone,
    {
        let keep = |entities: &[E]| -> Vec<E> {
            entities.iter().filter(|e| filter(*e)).cloned().collect()
        };
        ChangeSet {
            inserted: keep(&self.inserted),
            deleted: keep(&self.deleted),
            updated: keep(&self.updated),
        }
    }
}

impl<E> Default for ChangeSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A source of change sets that listeners subscribe to.
pub trait ChangeFeed<E> {
    /// Register `listener` for changes matching `filter`. The subscription
    /// ends when the returned handle is dropped.
    fn subscribe<F>(
        &self,
        filter: F,
        trigger: Trigger,
        listener: AnyChangeListener<'static, E>,
    ) -> Result<Subscription, FeedError>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static;

    /// Remove a subscription. Returns true if it was registered.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, FeedError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    LockPoisoned(&'static str),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::LockPoisoned(operation) => {
                write!(f, "change feed lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for FeedError {}
