//! Status State Machine
//!
//! Lifecycle states for values that arrive asynchronously: a request is
//! loading, then succeeds with data, fails with an error, or comes back
//! empty.
//!
//! # How Status Works
//!
//! 1. [`Status<T>`] is the state itself. Data exists only in `Success`;
//!    `Error` carries a message, `Loading`/`Empty`/`Custom` are bare tags.
//!
//! 2. [`StatusCell<T>`] holds a `Status<T>` in an observable plus a
//!    last-known-data slot that survives non-success states. Transitions go
//!    through the standard observable write, so setting the state it is
//!    already in broadcasts nothing.
//!
//! 3. [`StatusCell::futurize`] drives the whole cycle from one async
//!    operation: `Loading`, then `Success`/`Empty`/`Error` depending on the
//!    outcome. The operation's failure never escapes; it always becomes an
//!    `Error` transition.
//!
//! # Rendering
//!
//! [`Status::when`] dispatches to one handler per state. `Custom` has no
//! handler of its own there; it deliberately renders through the empty
//! handler. [`Status::when_full`] takes the fifth handler for callers that
//! distinguish it.
//!
//! # Example
//!
//! ```rust,ignore
//! let users: StatusCell<Vec<User>> = StatusCell::new();
//!
//! let status = users.futurize(|| fetch_users()).await;
//! let body = status.when(
//!     || "spinner".into(),
//!     |users| render_list(users),
//!     |error| render_error(error),
//!     || "nothing here".into(),
//! );
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::equality::{hash, DeepEq};
use crate::error::{ObservableError, StatusError};

use super::observable::Observable;
use super::subscribers::Subscription;

/// Lifecycle state of an asynchronously produced value.
#[derive(Debug, Clone)]
pub enum Status<T> {
    /// The operation is in flight.
    Loading,
    /// The operation produced data.
    Success(T),
    /// The operation failed.
    Error(StatusError),
    /// The operation produced no data worth showing.
    Empty,
    /// An application-defined state outside the built-in four.
    Custom,
}

impl<T> Status<T> {
    /// Shorthand for `Status::Error(StatusError::new(..))`.
    pub fn error(message: impl Into<StatusError>) -> Self {
        Status::Error(message.into())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Status::Error(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Status::Empty)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Status::Custom)
    }

    /// The payload, present only in `Success`.
    pub fn data(&self) -> Option<&T> {
        match self {
            Status::Success(data) => Some(data),
            _ => None,
        }
    }

    /// The error message, present only in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Status::Error(error) => Some(error.message()),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Status::Loading => "loading",
            Status::Success(_) => "success",
            Status::Error(_) => "error",
            Status::Empty => "empty",
            Status::Custom => "custom",
        }
    }

    /// Dispatch to one handler per state.
    ///
    /// `Custom` renders through `on_empty`; the arm is written out because
    /// the fallback is a deliberate default, not an oversight. Use
    /// [`when_full`](Self::when_full) to handle it separately.
    pub fn when<R>(
        &self,
        on_loading: impl FnOnce() -> R,
        on_success: impl FnOnce(&T) -> R,
        on_error: impl FnOnce(&StatusError) -> R,
        on_empty: impl FnOnce() -> R,
    ) -> R {
        match self {
            Status::Loading => on_loading(),
            Status::Success(data) => on_success(data),
            Status::Error(error) => on_error(error),
            Status::Empty => on_empty(),
            // Custom states have nothing to show; render as empty.
            Status::Custom => on_empty(),
        }
    }

    /// Dispatch with a dedicated `Custom` handler.
    pub fn when_full<R>(
        &self,
        on_loading: impl FnOnce() -> R,
        on_success: impl FnOnce(&T) -> R,
        on_error: impl FnOnce(&StatusError) -> R,
        on_empty: impl FnOnce() -> R,
        on_custom: impl FnOnce() -> R,
    ) -> R {
        match self {
            Status::Loading => on_loading(),
            Status::Success(data) => on_success(data),
            Status::Error(error) => on_error(error),
            Status::Empty => on_empty(),
            Status::Custom => on_custom(),
        }
    }
}

impl<T: DeepEq> DeepEq for Status<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Status::Loading, Status::Loading) => true,
            (Status::Success(a), Status::Success(b)) => a.deep_eq(b),
            (Status::Error(a), Status::Error(b)) => a.message() == b.message(),
            (Status::Empty, Status::Empty) => true,
            (Status::Custom, Status::Custom) => true,
            _ => false,
        }
    }

    fn deep_hash(&self) -> u64 {
        match self {
            Status::Loading => hash::finish(1),
            Status::Success(data) => hash::finish(hash::combine(2, data.deep_hash())),
            Status::Error(error) => hash::finish(hash::combine(3, error.message().deep_hash())),
            Status::Empty => hash::finish(4),
            Status::Custom => hash::finish(5),
        }
    }
}

impl<T: DeepEq> PartialEq for Status<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

/// What counts as "no data worth showing" for a successful result.
///
/// Scalars are never empty; strings and collections are empty when they have
/// no elements; `Option` recurses, with `None` always empty.
pub trait Emptiness {
    fn is_value_empty(&self) -> bool;
}

macro_rules! impl_never_empty {
    ($($ty:ty),* $(,)?) => {
        $(impl Emptiness for $ty {
            fn is_value_empty(&self) -> bool {
                false
            }
        })*
    };
}

impl_never_empty!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char);

impl Emptiness for () {
    fn is_value_empty(&self) -> bool {
        true
    }
}

impl Emptiness for str {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl Emptiness for String {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for [T] {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for Vec<T> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for std::collections::VecDeque<T> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T, S> Emptiness for std::collections::HashSet<T, S> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for std::collections::BTreeSet<T> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T, S> Emptiness for indexmap::IndexSet<T, S> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Emptiness for std::collections::HashMap<K, V, S> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Emptiness for std::collections::BTreeMap<K, V> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V, S> Emptiness for indexmap::IndexMap<K, V, S> {
    fn is_value_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Emptiness> Emptiness for Option<T> {
    fn is_value_empty(&self) -> bool {
        match self {
            Some(value) => value.is_value_empty(),
            None => true,
        }
    }
}

impl<T: Emptiness + ?Sized> Emptiness for &T {
    fn is_value_empty(&self) -> bool {
        (**self).is_value_empty()
    }
}

impl<T: Emptiness + ?Sized> Emptiness for Box<T> {
    fn is_value_empty(&self) -> bool {
        (**self).is_value_empty()
    }
}

impl<T: Emptiness + ?Sized> Emptiness for Arc<T> {
    fn is_value_empty(&self) -> bool {
        (**self).is_value_empty()
    }
}

/// Per-call configuration for [`StatusCell::futurize_with`].
pub struct FuturizeOptions<T> {
    initial: Option<T>,
    error_message: Option<String>,
    use_empty: bool,
    empty_when: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> FuturizeOptions<T> {
    pub fn new() -> Self {
        Self {
            initial: None,
            error_message: None,
            use_empty: true,
            empty_when: None,
        }
    }

    /// Seed the data slot with this value when no data is set yet.
    pub fn initial(mut self, value: T) -> Self {
        self.initial = Some(value);
        self
    }

    /// Replace the failure's own description in `Error` transitions.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Whether an empty successful result becomes `Empty` instead of
    /// `Success`. Defaults to `true`.
    pub fn use_empty(mut self, use_empty: bool) -> Self {
        self.use_empty = use_empty;
        self
    }

    /// Override the emptiness predicate for this call only.
    pub fn empty_when(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.empty_when = Some(Box::new(predicate));
        self
    }
}

impl<T> Default for FuturizeOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FuturizeOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuturizeOptions")
            .field("has_initial", &self.initial.is_some())
            .field("error_message", &self.error_message)
            .field("use_empty", &self.use_empty)
            .field("has_empty_when", &self.empty_when.is_some())
            .finish()
    }
}

/// A [`Status`] held in an observable, with a data slot that survives
/// non-success states.
///
/// Cloning shares the cell.
pub struct StatusCell<T> {
    status: Observable<Status<T>>,
    /// Last data set through `with_data`, `set_success`, or seeding.
    value: Arc<Mutex<Option<T>>>,
}

impl<T> StatusCell<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    /// Create a cell in `Loading` with no data.
    pub fn new() -> Self {
        Self {
            status: Observable::new(Status::Loading),
            value: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a cell seeded with `data`: `Success` when the data is
    /// non-empty, otherwise `Loading` with the data parked in the slot.
    pub fn with_data(data: T) -> Self
    where
        T: Emptiness,
    {
        let status = if data.is_value_empty() {
            Status::Loading
        } else {
            Status::Success(data.clone())
        };
        Self {
            status: Observable::new(status),
            value: Arc::new(Mutex::new(Some(data))),
        }
    }

    /// Read the current status. Tracked.
    pub fn status(&self) -> Status<T> {
        self.status.get()
    }

    /// Read the last-known data. Tracked through the status observable, so
    /// consumers re-run on transitions even when they only read the slot.
    pub fn data(&self) -> Option<T> {
        self.status.with(|_| self.value.lock().clone())
    }

    pub fn is_loading(&self) -> bool {
        self.status.with(|status| status.is_loading())
    }

    pub fn is_success(&self) -> bool {
        self.status.with(|status| status.is_success())
    }

    pub fn is_error(&self) -> bool {
        self.status.with(|status| status.is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.status.with(|status| status.is_empty())
    }

    pub fn is_custom(&self) -> bool {
        self.status.with(|status| status.is_custom())
    }

    /// Transition to `Loading`. Returns whether the status changed.
    pub fn set_loading(&self) -> bool {
        self.transition(Status::Loading)
    }

    /// Transition to `Success(data)` and update the data slot.
    pub fn set_success(&self, data: T) -> bool {
        *self.value.lock() = Some(data.clone());
        self.transition(Status::Success(data))
    }

    /// Transition to `Error`. The data slot is untouched.
    pub fn set_error(&self, error: impl Into<StatusError>) -> bool {
        self.transition(Status::Error(error.into()))
    }

    /// Transition to `Empty`. The data slot is untouched.
    pub fn set_empty(&self) -> bool {
        self.transition(Status::Empty)
    }

    /// Transition to `Custom`. The data slot is untouched.
    pub fn set_custom(&self) -> bool {
        self.transition(Status::Custom)
    }

    fn transition(&self, status: Status<T>) -> bool {
        let label = status.label();
        let changed = self.status.set(status);
        if changed {
            debug!(observable = self.status.id(), status = label, "status transition");
        }
        changed
    }

    /// Subscribe to status broadcasts.
    pub fn listen(
        &self,
        on_status: impl Fn(&Status<T>) + Send + Sync + 'static,
    ) -> Subscription {
        self.status.listen(on_status)
    }

    /// The underlying observable, for composing with watchers and workers.
    pub fn observable(&self) -> &Observable<Status<T>> {
        &self.status
    }

    /// Close the underlying observable.
    pub fn close(&self) -> Result<(), ObservableError> {
        self.status.close()
    }

    /// Drive a full load cycle from `op` with default options.
    ///
    /// Transitions to `Loading`, awaits `op()`, then transitions to
    /// `Success` (updating the data slot), `Empty` (empty result, slot
    /// untouched), or `Error` (failure's description). The failure never
    /// escapes as an error return; the cycle always settles in a status,
    /// which is also returned.
    pub async fn futurize<F, Fut, E>(&self, op: F) -> Status<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        T: Emptiness,
    {
        self.futurize_with(op, FuturizeOptions::new()).await
    }

    /// [`futurize`](Self::futurize) with explicit options.
    pub async fn futurize_with<F, Fut, E>(&self, op: F, options: FuturizeOptions<T>) -> Status<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        T: Emptiness,
    {
        if let Some(initial) = options.initial {
            let mut slot = self.value.lock();
            if slot.is_none() {
                *slot = Some(initial);
            }
        }
        self.set_loading();

        match op().await {
            Ok(result) => {
                let empty = match options.empty_when {
                    Some(ref predicate) => predicate(&result),
                    None => result.is_value_empty(),
                };
                if options.use_empty && empty {
                    self.set_empty();
                    Status::Empty
                } else {
                    self.set_success(result.clone());
                    Status::Success(result)
                }
            }
            Err(error) => {
                let message = options.error_message.unwrap_or_else(|| error.to_string());
                let error = StatusError::new(message);
                self.set_error(error.clone());
                Status::Error(error)
            }
        }
    }

    /// Run [`futurize`](Self::futurize) on a spawned tokio task.
    ///
    /// The returned handle resolves to the final status; dropping it does
    /// not cancel the cycle.
    pub fn futurize_detached<F, Fut, E>(&self, op: F) -> JoinHandle<Status<T>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
        T: Emptiness,
    {
        let cell = self.clone();
        tokio::spawn(async move { cell.futurize(op).await })
    }
}

impl<T> Default for StatusCell<T>
where
    T: DeepEq + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for StatusCell<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StatusCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCell")
            .field("status", &self.status)
            .field("has_data", &self.value.lock().is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::observer::Watcher;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn new_starts_loading_without_data() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        assert!(cell.is_loading());
        assert_eq!(cell.data(), None);
    }

    #[test]
    fn with_data_starts_success_when_nonempty() {
        let cell = StatusCell::with_data(vec![1, 2]);
        assert!(cell.is_success());
        assert_eq!(cell.data(), Some(vec![1, 2]));
    }

    #[test]
    fn with_data_starts_loading_when_empty() {
        let cell = StatusCell::with_data(Vec::<i32>::new());
        assert!(cell.is_loading());
        // The seed still lands in the slot.
        assert_eq!(cell.data(), Some(vec![]));
    }

    #[test]
    fn transitions_are_equality_gated() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let broadcasts = Arc::new(AtomicI32::new(0));
        let broadcasts_clone = broadcasts.clone();
        cell.listen(move |_| {
            broadcasts_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!cell.set_loading());
        assert_eq!(broadcasts.load(Ordering::SeqCst), 0);

        assert!(cell.set_success(vec![1]));
        assert!(!cell.set_success(vec![1]));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 1);

        assert!(cell.set_error("boom"));
        assert!(!cell.set_error("boom"));
        assert!(cell.set_error("other"));
        assert_eq!(broadcasts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn set_error_keeps_last_data() {
        let cell = StatusCell::with_data(vec![5]);
        cell.set_error("boom");
        assert!(cell.is_error());
        assert_eq!(cell.data(), Some(vec![5]));
        assert_eq!(
            cell.status().error_message().map(str::to_string),
            Some(String::from("boom")),
        );
    }

    #[test]
    fn data_reads_are_tracked() {
        let cell = StatusCell::new();
        let runs = Arc::new(AtomicI32::new(0));
        let _watcher = Watcher::new({
            let cell = cell.clone();
            let runs = Arc::clone(&runs);
            move || {
                let _ = cell.data();
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        cell.set_success(vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn when_dispatches_by_variant() {
        let success: Status<i32> = Status::Success(3);
        let rendered = success.when(
            || String::from("loading"),
            |data| format!("data: {data}"),
            |error| format!("error: {error}"),
            || String::from("empty"),
        );
        assert_eq!(rendered, "data: 3");

        let failed: Status<i32> = Status::error("boom");
        let rendered = failed.when(
            || String::from("loading"),
            |data| format!("data: {data}"),
            |error| format!("error: {error}"),
            || String::from("empty"),
        );
        assert_eq!(rendered, "error: boom");
    }

    #[test]
    fn when_custom_falls_back_to_empty_handler() {
        let custom: Status<i32> = Status::Custom;
        let rendered = custom.when(|| "loading", |_| "success", |_| "error", || "empty");
        assert_eq!(rendered, "empty");
    }

    #[test]
    fn when_full_separates_custom() {
        let custom: Status<i32> = Status::Custom;
        let rendered = custom.when_full(
            || "loading",
            |_| "success",
            |_| "error",
            || "empty",
            || "custom",
        );
        assert_eq!(rendered, "custom");
    }

    #[test]
    fn status_equality_is_tag_and_payload() {
        assert_eq!(Status::<i32>::Loading, Status::<i32>::Loading);
        assert_ne!(Status::<i32>::Loading, Status::<i32>::Empty);
        assert_eq!(Status::Success(vec![1]), Status::Success(vec![1]));
        assert_ne!(Status::Success(vec![1]), Status::Success(vec![2]));
        assert_eq!(Status::<i32>::error("a"), Status::<i32>::error("a"));
        assert_ne!(Status::<i32>::error("a"), Status::<i32>::error("b"));
        assert_ne!(
            Status::<i32>::Loading.deep_hash(),
            Status::<i32>::Empty.deep_hash(),
        );
    }

    #[test]
    fn emptiness_covers_core_shapes() {
        use std::collections::HashMap;

        assert!("".is_value_empty());
        assert!(!"x".is_value_empty());
        assert!(Vec::<i32>::new().is_value_empty());
        assert!(!vec![1].is_value_empty());
        assert!(HashMap::<i32, i32>::new().is_value_empty());
        assert!(None::<String>.is_value_empty());
        assert!(Some(String::new()).is_value_empty());
        assert!(!Some(String::from("x")).is_value_empty());
        assert!(!0.is_value_empty());
        assert!(!false.is_value_empty());
    }

    #[tokio::test]
    async fn futurize_success_updates_data() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let status = cell
            .futurize(|| async { Ok::<_, String>(vec![1, 2, 3]) })
            .await;
        assert_eq!(status, Status::Success(vec![1, 2, 3]));
        assert!(cell.is_success());
        assert_eq!(cell.data(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn futurize_empty_result_becomes_empty() {
        let cell = StatusCell::with_data(vec![9]);
        let status = cell.futurize(|| async { Ok::<_, String>(vec![]) }).await;
        assert_eq!(status, Status::Empty);
        assert!(cell.is_empty());
        // The slot keeps the previous data.
        assert_eq!(cell.data(), Some(vec![9]));
    }

    #[tokio::test]
    async fn futurize_failure_becomes_error_with_its_description() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let status = cell
            .futurize(|| async { Err::<Vec<i32>, _>(String::from("boom")) })
            .await;
        assert_eq!(status.error_message(), Some("boom"));
        assert!(cell.is_error());
    }

    #[tokio::test]
    async fn futurize_error_message_override() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let status = cell
            .futurize_with(
                || async { Err::<Vec<i32>, _>(String::from("boom")) },
                FuturizeOptions::new().error_message("friendly message"),
            )
            .await;
        assert_eq!(status.error_message(), Some("friendly message"));
    }

    #[tokio::test]
    async fn futurize_initial_seeds_missing_data() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let probe = cell.clone();
        let status = cell
            .futurize_with(
                move || async move { Ok::<_, String>(probe.data().unwrap_or_default()) },
                FuturizeOptions::new().initial(vec![7]),
            )
            .await;
        // The operation observed the seeded slot and echoed it back.
        assert_eq!(status, Status::Success(vec![7]));
        assert_eq!(cell.data(), Some(vec![7]));
    }

    #[tokio::test]
    async fn futurize_initial_does_not_replace_existing_data() {
        let cell = StatusCell::with_data(vec![1]);
        cell.futurize_with(
            || async { Ok::<_, String>(vec![2]) },
            FuturizeOptions::new().initial(vec![7]),
        )
        .await;
        assert_eq!(cell.data(), Some(vec![2]));
    }

    #[tokio::test]
    async fn futurize_empty_when_override() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let status = cell
            .futurize_with(
                || async { Ok::<_, String>(vec![0, 0]) },
                FuturizeOptions::new().empty_when(|values: &Vec<i32>| values.iter().all(|&v| v == 0)),
            )
            .await;
        assert_eq!(status, Status::Empty);
    }

    #[tokio::test]
    async fn futurize_use_empty_false_keeps_success() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let status = cell
            .futurize_with(
                || async { Ok::<_, String>(vec![]) },
                FuturizeOptions::new().use_empty(false),
            )
            .await;
        assert_eq!(status, Status::Success(vec![]));
        assert_eq!(cell.data(), Some(vec![]));
    }

    #[tokio::test]
    async fn futurize_broadcasts_loading_then_outcome() {
        let cell = StatusCell::with_data(vec![1]);
        let labels = Arc::new(Mutex::new(Vec::new()));
        let labels_clone = Arc::clone(&labels);
        cell.listen(move |status| labels_clone.lock().push(status.label()));

        cell.futurize(|| async { Ok::<_, String>(vec![2]) }).await;
        assert_eq!(*labels.lock(), vec!["loading", "success"]);
    }

    #[tokio::test]
    async fn futurize_detached_settles_the_cell() {
        let cell: StatusCell<Vec<i32>> = StatusCell::new();
        let handle = cell.futurize_detached(|| async { Ok::<_, String>(vec![4]) });
        let status = handle.await.unwrap();
        assert_eq!(status, Status::Success(vec![4]));
        assert_eq!(cell.data(), Some(vec![4]));
    }
}
