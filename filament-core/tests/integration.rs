//! Integration Tests for the Reactive Core
//!
//! These tests verify that observables, tracking, watchers, status cells,
//! collections, and workers work together correctly.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use filament_core::collections::{RxList, RxMap, RxSet};
use filament_core::error::ObservableError;
use filament_core::reactive::{
    debounce, once, Observable, Status, StatusCell, TrackPolicy, Watcher,
};

/// Test the complete chain: observable -> tracked read -> watcher re-run,
/// with the equality gate filtering redundant writes.
#[test]
fn watcher_reacts_through_the_full_chain() {
    let count = Observable::new(0);
    let observed = Arc::new(AtomicI32::new(-1));

    let observed_clone = observed.clone();
    let count_clone = count.clone();
    let watcher = Watcher::new(move || {
        observed_clone.store(count_clone.get(), Ordering::SeqCst);
    });

    // Ran once on creation, captured the initial value
    assert_eq!(observed.load(Ordering::SeqCst), 0);
    assert_eq!(watcher.run_count(), 1);

    count.set(42);
    assert_eq!(observed.load(Ordering::SeqCst), 42);
    assert_eq!(watcher.run_count(), 2);

    // Equal value: no broadcast, no re-run
    count.set(42);
    assert_eq!(watcher.run_count(), 2);
}

/// Test that re-tracking follows the branch the computation actually took.
#[test]
fn conditional_dependencies_switch_with_the_branch() {
    let use_first = Observable::new(true);
    let first = Observable::new(String::from("a"));
    let second = Observable::new(String::from("b"));
    let runs = Arc::new(AtomicI32::new(0));

    let _watcher = Watcher::new({
        let use_first = use_first.clone();
        let first = first.clone();
        let second = second.clone();
        let runs = Arc::clone(&runs);
        move || {
            let _ = if use_first.get() {
                first.get()
            } else {
                second.get()
            };
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // The untaken branch is not a dependency.
    second.set(String::from("b2"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Flip the branch; the dependency set follows.
    use_first.set(false);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    second.set(String::from("b3"));
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    first.set(String::from("a2"));
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Test that the accumulate policy keeps watching abandoned branches.
#[test]
fn accumulate_policy_keeps_watching_both_branches() {
    let use_first = Observable::new(true);
    let first = Observable::new(0);
    let second = Observable::new(0);
    let runs = Arc::new(AtomicI32::new(0));

    let _watcher = Watcher::with_policy(TrackPolicy::Accumulate, {
        let use_first = use_first.clone();
        let first = first.clone();
        let second = second.clone();
        let runs = Arc::clone(&runs);
        move || {
            let _ = if use_first.get() {
                first.get()
            } else {
                second.get()
            };
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });

    use_first.set(false);
    let after_flip = runs.load(Ordering::SeqCst);

    // The first branch is no longer read, but its registration survives.
    first.set(7);
    assert_eq!(runs.load(Ordering::SeqCst), after_flip + 1);
}

/// Test that a listener writing into another observable settles the graph.
#[test]
fn chained_observables_propagate_synchronously() {
    let celsius = Observable::new(0);
    let fahrenheit = Observable::new(32);

    let fahrenheit_clone = fahrenheit.clone();
    celsius.listen(move |degrees: &i32| {
        fahrenheit_clone.set(degrees * 9 / 5 + 32);
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);
    fahrenheit.listen(move |degrees| seen_clone.lock().push(*degrees));

    celsius.set(100);
    celsius.set(0);
    assert_eq!(fahrenheit.get_untracked(), 32);
    assert_eq!(*seen.lock(), vec![212, 32]);
}

/// Test that watchers re-run on collection mutations but not on no-ops.
#[test]
fn collections_drive_watchers() {
    let items: RxList<i32> = RxList::new();
    let lengths = Arc::new(Mutex::new(Vec::new()));

    let _watcher = Watcher::new({
        let items = items.clone();
        let lengths = Arc::clone(&lengths);
        move || {
            lengths.lock().push(items.len());
        }
    });
    assert_eq!(*lengths.lock(), vec![0]);

    items.push(1);
    items.push(2);
    assert_eq!(*lengths.lock(), vec![0, 1, 2]);

    // Removing a missing index changes nothing and re-runs nothing.
    items.remove(99);
    assert_eq!(*lengths.lock(), vec![0, 1, 2]);
}

/// Test the documented zero-broadcast guarantees across all three adapters.
#[test]
fn ineffective_collection_mutations_stay_silent() {
    let list: RxList<i32> = RxList::new();
    let set: RxSet<i32> = RxSet::new();
    let map: RxMap<String, i32> = RxMap::new();
    set.insert(1);

    let broadcasts = Arc::new(AtomicI32::new(0));
    for_each_broadcast(&list, &set, &map, &broadcasts);

    list.remove(0);
    list.clear();
    set.insert(1);
    set.remove(&9);
    map.remove("missing");
    map.clear();
    assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

    // One effective mutation per adapter, one broadcast each.
    list.push(1);
    set.insert(2);
    map.insert(String::from("a"), 1);
    assert_eq!(broadcasts.load(Ordering::SeqCst), 3);
}

fn for_each_broadcast(
    list: &RxList<i32>,
    set: &RxSet<i32>,
    map: &RxMap<String, i32>,
    broadcasts: &Arc<AtomicI32>,
) {
    let counter = Arc::clone(broadcasts);
    list.listen(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(broadcasts);
    set.listen(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let counter = Arc::clone(broadcasts);
    map.listen(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
}

/// Test a status cell driven by `futurize`, observed through a listener
/// and rendered with `when`.
#[tokio::test]
async fn status_cycle_end_to_end() {
    let users: StatusCell<Vec<String>> = StatusCell::new();
    let transitions = Arc::new(Mutex::new(Vec::new()));

    let transitions_clone = Arc::clone(&transitions);
    users.listen(move |status| {
        let label = status.when(
            || "loading",
            |_| "success",
            |_| "error",
            || "empty",
        );
        transitions_clone.lock().push(label);
    });

    // A failed load, then a successful one, then an empty one.
    users
        .futurize(|| async { Err::<Vec<String>, _>(String::from("network down")) })
        .await;
    users
        .futurize(|| async { Ok::<_, String>(vec![String::from("ada")]) })
        .await;
    users.futurize(|| async { Ok::<_, String>(vec![]) }).await;

    // The first loading transition is silent: the cell started in Loading.
    assert_eq!(
        *transitions.lock(),
        vec!["error", "loading", "success", "loading", "empty"],
    );

    // Empty kept the last good data.
    assert_eq!(users.data(), Some(vec![String::from("ada")]));
}

/// Test that a watcher re-runs on status transitions it reads.
#[tokio::test]
async fn watcher_follows_a_status_cell() {
    let cell: StatusCell<Vec<i32>> = StatusCell::new();
    let labels = Arc::new(Mutex::new(Vec::new()));

    let _watcher = Watcher::new({
        let cell = cell.clone();
        let labels = Arc::clone(&labels);
        move || {
            let label = cell.status().when(
                || "loading",
                |_| "success",
                |_| "error",
                || "empty",
            );
            labels.lock().push(label);
        }
    });

    cell.futurize(|| async { Ok::<_, String>(vec![1]) }).await;
    assert_eq!(*labels.lock(), vec!["loading", "success"]);
}

/// Test closing an observable: done delivery, teardown, closed-use errors.
#[test]
fn close_tears_down_the_graph() {
    let observable = Observable::new(0);
    let done = Arc::new(AtomicBool::new(false));

    let done_clone = done.clone();
    let subscription = observable.subscribe(
        filament_core::reactive::Subscriber::new(|_: &i32| {}).on_done(move || {
            done_clone.store(true, Ordering::SeqCst);
        }),
    );

    observable.close().unwrap();
    assert!(done.load(Ordering::SeqCst));
    assert!(!subscription.is_active());
    assert_eq!(observable.subscriber_count(), 0);

    // Closed-use surfaces as errors on the try API.
    assert_eq!(observable.try_set(1), Err(ObservableError::Closed));
    assert_eq!(observable.close(), Err(ObservableError::AlreadyClosed));
}

/// Test `once` composed with a chain: the first broadcast detaches it.
#[test]
fn once_worker_end_to_end() {
    let source = Observable::new(0);
    let first_seen = Arc::new(AtomicI32::new(-1));

    let first_seen_clone = first_seen.clone();
    once(&source, move |value| {
        first_seen_clone.store(*value, Ordering::SeqCst);
    });

    source.set(7);
    source.set(8);
    assert_eq!(first_seen.load(Ordering::SeqCst), 7);
    assert_eq!(source.subscriber_count(), 0);
}

/// Test a debounced pipeline: rapid writes collapse into one delivery.
#[tokio::test(start_paused = true)]
async fn debounce_worker_end_to_end() {
    let query = Observable::new(String::new());
    let submitted = Arc::new(Mutex::new(Vec::new()));

    let submitted_clone = Arc::clone(&submitted);
    let _worker = debounce(&query, Duration::from_millis(300), move |text: String| {
        submitted_clone.lock().push(text);
    });

    // A user typing: every keystroke writes, only the pause submits.
    query.set(String::from("f"));
    query.set(String::from("fi"));
    query.set(String::from("fil"));
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(*submitted.lock(), vec![String::from("fil")]);
}

/// Test that deep equality spares watchers from order-only rewrites.
#[test]
fn deep_equality_spares_redundant_reruns() {
    use std::collections::HashSet;

    let tags = Observable::new(HashSet::from([1, 2, 3]));
    let runs = Arc::new(AtomicI32::new(0));

    let _watcher = Watcher::new({
        let tags = tags.clone();
        let runs = Arc::clone(&runs);
        move || {
            let _ = tags.get();
            runs.fetch_add(1, Ordering::SeqCst);
        }
    });
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // Same elements, different construction order: not a change.
    tags.set(HashSet::from([3, 2, 1]));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    tags.set(HashSet::from([1, 2, 3, 4]));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test a status model assembled from collections: a map of cells.
#[tokio::test]
async fn per_key_status_cells_compose() {
    let cells: RxMap<String, i32> = RxMap::new();
    let profile: StatusCell<Vec<String>> = StatusCell::new();

    // Selection drives a load; the loaded data lands in the map.
    let status = profile
        .futurize(|| async { Ok::<_, String>(vec![String::from("ada")]) })
        .await;
    assert_eq!(status, Status::Success(vec![String::from("ada")]));

    cells.insert(String::from("ada"), 1);
    assert_eq!(cells.get("ada"), Some(1));
    assert_eq!(cells.len(), 1);
}
