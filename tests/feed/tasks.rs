//! Task entities and listeners of several concrete types.

use std::collections::BTreeMap;

use erased_rust::feed::{ChangeListener, ChangeSet, FeedEntity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub done: bool,
}

impl Task {
    pub fn new(id: &str, title: &str, done: bool) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            done,
        }
    }
}

impl FeedEntity for Task {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Counts changes per set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeCounter {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub batches: usize,
}

impl ChangeListener for ChangeCounter {
    type Entity = Task;

    fn on_change(&mut self, changes: &ChangeSet<Task>) {
        self.inserted += changes.inserted.len();
        self.updated += changes.updated.len();
        self.deleted += changes.deleted.len();
        self.batches += 1;
    }
}

/// Keeps a title per task id, dropping deleted tasks.
#[derive(Debug, Default)]
pub struct TitleIndex {
    pub titles: BTreeMap<String, String>,
}

impl ChangeListener for TitleIndex {
    type Entity = Task;

    fn on_change(&mut self, changes: &ChangeSet<Task>) {
        for task in changes.inserted.iter().chain(&changes.updated) {
            self.titles.insert(task.id.clone(), task.title.clone());
        }
        for task in &changes.deleted {
            self.titles.remove(&task.id);
        }
    }
}
