//! Integration tests for the change feed and its erased listeners.

#![cfg(feature = "feed")]

mod tasks;

use std::sync::{Arc, Mutex};

use erased_rust::feed::{
    AnyChangeListener, ChangeFeed, ChangeSet, InMemoryChangeFeed, ListenerFn, Trigger,
};
use erased_rust::SyncShared;
use tasks::{ChangeCounter, Task, TitleIndex};

#[test]
fn listeners_of_different_types_share_one_feed() {
    let feed = InMemoryChangeFeed::<Task>::new();
    let counter = SyncShared::new(ChangeCounter::default());
    let index = SyncShared::new(TitleIndex::default());
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&seen);
    let listeners: Vec<AnyChangeListener<Task>> = vec![
        AnyChangeListener::new(counter.clone()),
        AnyChangeListener::new(index.clone()),
        AnyChangeListener::new(ListenerFn::new(move |changes: &ChangeSet<Task>| {
            sink.lock().unwrap().push(changes.len());
        })),
    ];

    let _subscriptions: Vec<_> = listeners
        .into_iter()
        .map(|listener| feed.subscribe(|_| true, Trigger::OnMutation, listener).unwrap())
        .collect();

    assert_eq!(feed.insert(Task::new("t-1", "write docs", false)).unwrap(), 3);
    assert_eq!(feed.update(Task::new("t-1", "write more docs", false)).unwrap(), 3);
    assert_eq!(feed.insert(Task::new("t-2", "ship", false)).unwrap(), 3);
    assert_eq!(feed.delete(Task::new("t-2", "ship", false)).unwrap(), 3);

    assert_eq!(
        *counter.read(),
        ChangeCounter {
            inserted: 2,
            updated: 1,
            deleted: 1,
            batches: 4,
        }
    );
    assert_eq!(
        index.read().titles.get("t-1").map(String::as_str),
        Some("write more docs")
    );
    assert!(!index.read().titles.contains_key("t-2"));
    assert_eq!(*seen.lock().unwrap(), [1, 1, 1, 1]);
}

#[test]
fn commit_subscribers_hear_once_per_commit() {
    let feed = InMemoryChangeFeed::<Task>::new();
    let per_mutation = SyncShared::new(ChangeCounter::default());
    let per_commit = SyncShared::new(ChangeCounter::default());

    let _mutations = feed
        .subscribe(
            |_| true,
            Trigger::OnMutation,
            AnyChangeListener::new(per_mutation.clone()),
        )
        .unwrap();
    let _commits = feed
        .subscribe(
            |_| true,
            Trigger::OnCommit,
            AnyChangeListener::new(per_commit.clone()),
        )
        .unwrap();

    feed.insert(Task::new("t-1", "a", false)).unwrap();
    feed.insert(Task::new("t-2", "b", false)).unwrap();
    feed.update(Task::new("t-1", "a2", true)).unwrap();
    assert_eq!(per_commit.read().batches, 0);

    assert_eq!(feed.commit().unwrap(), 1);

    assert_eq!(per_mutation.read().batches, 3);
    assert_eq!(
        *per_commit.read(),
        ChangeCounter {
            inserted: 2,
            updated: 0,
            deleted: 0,
            batches: 1,
        }
    );
}

#[test]
fn filters_apply_per_subscriber() {
    let feed = InMemoryChangeFeed::<Task>::new();
    let done = SyncShared::new(TitleIndex::default());
    let open = SyncShared::new(TitleIndex::default());

    let _done = feed
        .subscribe(
            |task: &Task| task.done,
            Trigger::OnCommit,
            AnyChangeListener::new(done.clone()),
        )
        .unwrap();
    let _open = feed
        .subscribe(
            |task: &Task| !task.done,
            Trigger::OnCommit,
            AnyChangeListener::new(open.clone()),
        )
        .unwrap();

    feed.insert(Task::new("t-1", "finished", true)).unwrap();
    feed.insert(Task::new("t-2", "pending", false)).unwrap();
    feed.insert(Task::new("t-3", "also finished", true)).unwrap();
    assert_eq!(feed.commit().unwrap(), 2);

    let done: Vec<String> = done.read().titles.keys().cloned().collect();
    let open: Vec<String> = open.read().titles.keys().cloned().collect();
    assert_eq!(done, ["t-1", "t-3"]);
    assert_eq!(open, ["t-2"]);
}

#[test]
fn subscribers_without_matches_are_skipped() {
    let feed = InMemoryChangeFeed::<Task>::new();
    let counter = SyncShared::new(ChangeCounter::default());
    let _subscription = feed
        .subscribe(
            |task: &Task| task.id.starts_with("urgent-"),
            Trigger::OnMutation,
            AnyChangeListener::new(counter.clone()),
        )
        .unwrap();

    assert_eq!(feed.insert(Task::new("t-1", "later", false)).unwrap(), 0);
    assert_eq!(feed.insert(Task::new("urgent-1", "now", false)).unwrap(), 1);
    assert_eq!(counter.read().batches, 1);
}

#[test]
fn feed_clones_share_subscribers() {
    let feed = InMemoryChangeFeed::<Task>::new();
    let writer = feed.clone();
    let counter = SyncShared::new(ChangeCounter::default());

    let subscription = feed
        .subscribe(
            |_| true,
            Trigger::OnMutation,
            AnyChangeListener::new(counter.clone()),
        )
        .unwrap();

    writer.insert(Task::new("t-1", "a", false)).unwrap();
    assert_eq!(counter.read().inserted, 1);

    assert!(feed.unsubscribe(subscription.id()).unwrap());
    writer.insert(Task::new("t-2", "b", false)).unwrap();
    assert_eq!(counter.read().inserted, 1);
}

#[test]
fn listeners_and_feed_cross_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AnyChangeListener<Task>>();
    assert_send_sync::<InMemoryChangeFeed<Task>>();

    let feed = InMemoryChangeFeed::<Task>::new();
    let counter = SyncShared::new(ChangeCounter::default());
    let _subscription = feed
        .subscribe(
            |_| true,
            Trigger::OnMutation,
            AnyChangeListener::new(counter.clone()),
        )
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let feed = feed.clone();
            std::thread::spawn(move || {
                feed.insert(Task::new(&format!("t-{}", n), "parallel", false))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.read().inserted, 4);
    assert_eq!(feed.pending_len().unwrap(), 4);
}

#[cfg(feature = "emitter")]
#[test]
fn emitter_listener_republishes_commits() {
    use std::sync::mpsc;
    use std::time::Duration;

    use erased_rust::feed::EmitterListener;
    use erased_rust::EventEmitter;

    let mut emitter = EventEmitter::new();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    emitter.on("tasks.committed", move |payload: String| {
        let _ = tx.lock().unwrap().send(payload);
    });

    let feed = InMemoryChangeFeed::<Task>::new();
    let _subscription = feed
        .subscribe(
            |_| true,
            Trigger::OnCommit,
            AnyChangeListener::new(EmitterListener::new(emitter, "tasks.committed")),
        )
        .unwrap();

    feed.insert(Task::new("t-1", "announce", false)).unwrap();
    feed.commit().unwrap();

    let payload = rx.recv_timeout(Duration::from_secs(2)).unwrap();
    let changes: ChangeSet<Task> = serde_json::from_str(&payload).unwrap();
    assert_eq!(changes.inserted, vec![Task::new("t-1", "announce", false)]);
    assert!(changes.updated.is_empty());
}
