use std::fmt;

/// Identifies one subscription within its feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}

/// Scoped handle for a subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: SubscriptionId,
    cancel: Option<Box<dyn FnOnce(SubscriptionId) + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriptionId, cancel: F) -> Self
    where
        F: FnOnce(SubscriptionId) + Send + Sync + 'static,
    {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the subscription registered for as long as the feed lives.
    pub fn detach(mut self) -> SubscriptionId {
        self.cancel = None;
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.cancel.is_some())
            .finish()
    }
}
