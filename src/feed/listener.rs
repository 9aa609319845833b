use std::fmt;
use std::marker::PhantomData;

use crate::erasable;

use super::ChangeSet;

/// Something that reacts to change sets for one entity type.
#[erasable(name = AnyChangeListener, sync, shared)]
pub trait ChangeListener {
    type Entity;

    fn on_change(&mut self, changes: &ChangeSet<Self::Entity>);
}

/// A closure as a [`ChangeListener`].
pub struct ListenerFn<E, F> {
    handler: F,
    _entity: PhantomData<fn(&E)>,
}

impl<E, F> ListenerFn<E, F>
where
    F: FnMut(&ChangeSet<E>),
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _entity: PhantomData,
        }
    }
}

impl<E, F> ChangeListener for ListenerFn<E, F>
where
    F: FnMut(&ChangeSet<E>),
{
    type Entity = E;

    fn on_change(&mut self, changes: &ChangeSet<E>) {
        (self.handler)(changes)
    }
}

impl<E, F> fmt::Debug for ListenerFn<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerFn").finish_non_exhaustive()
    }
}
