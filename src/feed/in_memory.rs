//! InMemoryChangeFeed - RwLock-backed change feed for testing and development.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, Weak};

use tracing::{debug, trace, warn};

use super::{
    AnyChangeListener, ChangeFeed, ChangeKind, ChangeListener, ChangeSet, FeedEntity, FeedError,
    Subscription, SubscriptionId, Trigger,
};

struct Subscriber<E> {
    id: SubscriptionId,
    trigger: Trigger,
    filter: Box<dyn Fn(&E) -> bool + Send + Sync>,
    listener: AnyChangeListener<'static, E>,
}

/// A change staged for the next commit, coalesced per entity key.
struct Staged<E> {
    key: String,
    kind: ChangeKind,
    entity: E,
}

struct FeedState<E> {
    next_id: u64,
    subscribers: Vec<Subscriber<E>>,
    staged: Vec<Staged<E>>,
}

impl<E: FeedEntity> FeedState<E> {
    /// Hands `changes` to every matching subscriber. A subscriber whose
    /// filter or listener panics is unsubscribed; the panic never reaches
    /// the feed's lock.
    fn deliver(&mut self, trigger: Trigger, changes: &ChangeSet<E>) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for subscriber in self.subscribers.iter_mut() {
            if subscriber.trigger != trigger {
                continue;
            }
            let id = subscriber.id;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                let filter = &subscriber.filter;
                let matching = changes.filtered(|entity| filter(entity));
                if matching.is_empty() {
                    return false;
                }
                trace!(subscription = %id, changes = matching.len(), "delivering change set");
                subscriber.listener.on_change(&matching);
                true
            }));
            match outcome {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(_) => {
                    warn!(subscription = %id, "change listener panicked, unsubscribing it");
                    failed.push(id);
                }
            }
        }
        if !failed.is_empty() {
            self.subscribers
                .retain(|subscriber| !failed.contains(&subscriber.id));
        }
        delivered
    }

    fn stage(&mut self, kind: ChangeKind, entity: E) {
        let position = self
            .staged
            .iter()
            .position(|staged| staged.key == entity.key());
        match position {
            None => self.staged.push(Staged {
                key: entity.key().to_string(),
                kind,
                entity,
            }),
            Some(index) => match self.staged[index].kind.then(kind) {
                Some(merged) => {
                    let staged = &mut self.staged[index];
                    staged.kind = merged;
                    staged.entity = entity;
                }
                None => {
                    self.staged.remove(index);
                }
            },
        }
    }
}

/// In-memory change feed.
///
/// Clone-friendly via Arc: clones observe and mutate the same feed.
/// Listeners run under the feed's write lock, so they must not call back
/// into the same feed. A listener that panics is dropped from the feed and
/// the feed keeps working.
pub struct InMemoryChangeFeed<E> {
    state: Arc<RwLock<FeedState<E>>>,
}

impl<E> Clone for InMemoryChangeFeed<E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<E: FeedEntity> Default for InMemoryChangeFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FeedEntity> InMemoryChangeFeed<E> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(FeedState {
                next_id: 1,
                subscribers: Vec::new(),
                staged: Vec::new(),
            })),
        }
    }

    /// Record an inserted entity. Returns how many listeners were notified.
    pub fn insert(&self, entity: E) -> Result<usize, FeedError> {
        self.record(ChangeKind::Inserted, entity)
    }

    /// Record an updated entity. Returns how many listeners were notified.
    pub fn update(&self, entity: E) -> Result<usize, FeedError> {
        self.record(ChangeKind::Updated, entity)
    }

    /// Record a deleted entity. Returns how many listeners were notified.
    pub fn delete(&self, entity: E) -> Result<usize, FeedError> {
        self.record(ChangeKind::Deleted, entity)
    }

    /// Deliver everything staged since the last commit to `OnCommit`
    /// subscribers. Returns how many listeners were notified.
    pub fn commit(&self) -> Result<usize, FeedError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| FeedError::LockPoisoned("commit"))?;

        let mut changes = ChangeSet::new();
        for staged in std::mem::take(&mut state.staged) {
            changes.push(staged.kind, staged.entity);
        }
        if changes.is_empty() {
            return Ok(0);
        }

        let delivered = state.deliver(Trigger::OnCommit, &changes);
        debug!(changes = changes.len(), delivered, "committed change feed");
        Ok(delivered)
    }

    /// Number of entities staged for the next commit.
    pub fn pending_len(&self) -> Result<usize, FeedError> {
        let state = self
            .state
            .read()
            .map_err(|_| FeedError::LockPoisoned("pending_len"))?;
        Ok(state.staged.len())
    }

    pub fn subscriber_count(&self) -> Result<usize, FeedError> {
        let state = self
            .state
            .read()
            .map_err(|_| FeedError::LockPoisoned("subscriber_count"))?;
        Ok(state.subscribers.len())
    }

    fn record(&self, kind: ChangeKind, entity: E) -> Result<usize, FeedError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| FeedError::LockPoisoned("record"))?;

        let mut changes = ChangeSet::new();
        changes.push(kind, entity.clone());
        state.stage(kind, entity);
        Ok(state.deliver(Trigger::OnMutation, &changes))
    }

    fn remove(state: &RwLock<FeedState<E>>, id: SubscriptionId) -> Result<bool, FeedError> {
        let mut state = state
            .write()
            .map_err(|_| FeedError::LockPoisoned("unsubscribe"))?;
        let before = state.subscribers.len();
        state.subscribers.retain(|subscriber| subscriber.id != id);
        let removed = state.subscribers.len() != before;
        if removed {
            debug!(subscription = %id, "unsubscribed from change feed");
        }
        Ok(removed)
    }
}

impl<E: FeedEntity> ChangeFeed<E> for InMemoryChangeFeed<E> {
    fn subscribe<F>(
        &self,
        filter: F,
        trigger: Trigger,
        listener: AnyChangeListener<'static, E>,
    ) -> Result<Subscription, FeedError>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| FeedError::LockPoisoned("subscribe"))?;

        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        state.subscribers.push(Subscriber {
            id,
            trigger,
            filter: Box::new(filter),
            listener,
        });
        debug!(subscription = %id, ?trigger, "subscribed to change feed");

        let feed: Weak<RwLock<FeedState<E>>> = Arc::downgrade(&self.state);
        Ok(Subscription::new(id, move |id| {
            if let Some(state) = feed.upgrade() {
                if let Err(error) = Self::remove(&state, id) {
                    warn!(subscription = %id, %error, "failed to unsubscribe on drop");
                }
            }
        }))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, FeedError> {
        Self::remove(&self.state, id)
    }
}
