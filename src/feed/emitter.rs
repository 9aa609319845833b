use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::warn;

use crate::EventEmitter;

use super::{ChangeListener, ChangeSet};

/// A listener that republishes each change set on an [`EventEmitter`] as a
/// JSON string, for in-process subscribers of that emitter.
pub struct EmitterListener<E> {
    emitter: EventEmitter,
    event: String,
    _entity: PhantomData<fn(&E)>,
}

impl<E> EmitterListener<E> {
    pub fn new(emitter: EventEmitter, event: impl Into<String>) -> Self {
        Self {
            emitter,
            event: event.into(),
            _entity: PhantomData,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn emitter_mut(&mut self) -> &mut EventEmitter {
        &mut self.emitter
    }

    pub fn into_emitter(self) -> EventEmitter {
        self.emitter
    }
}

impl<E: Serialize> ChangeListener for EmitterListener<E> {
    type Entity = E;

    fn on_change(&mut self, changes: &ChangeSet<E>) {
        match serde_json::to_string(changes) {
            Ok(payload) => {
                self.emitter.emit(&self.event, payload);
            }
            Err(error) => {
                warn!(event = %self.event, %error, "dropping change set that failed to serialize");
            }
        }
    }
}

impl<E> fmt::Debug for EmitterListener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterListener")
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
