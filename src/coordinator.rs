//! Bridges the store's live query to the TUI and dispatches user writes.
//!
//! The coordinator keeps one piece of state, the latest snapshot of the movie
//! list, and at most one pump task feeding it from a [`LiveQuery`]. Consumers
//! attach through [`MovieCoordinator::watch`]. When the last one detaches the
//! pump keeps running for `idle_timeout` so that a quick re-attach (switching
//! screens, for instance) reuses it instead of opening a new query.
//!
//! Writes are fire-and-forget: each one is spawned on the runtime and hands
//! back a [`Pending`] that callers may await or simply drop. Their effect is
//! only observed through the next snapshot.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::StoreError;
use crate::models::{Movie, NewMovie};
use crate::store::{LiveQuery, MovieStore};

/// Shared, immutable list handed to every consumer.
pub type Snapshot = Arc<Vec<Movie>>;

/// Pause before the pump re-opens a live query that failed.
const PUMP_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Default)]
struct Subscription {
    consumers: usize,
    /// Bumped by every attach. A teardown timer only fires if nothing attached
    /// since it was scheduled.
    epoch: u64,
    pump: Option<JoinHandle<()>>,
    teardown: Option<JoinHandle<()>>,
}

struct Inner {
    store: MovieStore,
    runtime: Handle,
    idle_timeout: Duration,
    snapshot: Arc<watch::Sender<Snapshot>>,
    subscription: Mutex<Subscription>,
}

impl Inner {
    fn subscription(&self) -> MutexGuard<'_, Subscription> {
        // The guarded data is a counter and two task handles; a panic while
        // holding the lock cannot leave them in a state worth refusing.
        self.subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn attach(&self) {
        let mut sub = self.subscription();
        sub.consumers += 1;
        sub.epoch = sub.epoch.wrapping_add(1);
        if let Some(teardown) = sub.teardown.take() {
            teardown.abort();
        }
        let running = sub.pump.as_ref().is_some_and(|pump| !pump.is_finished());
        if !running {
            log::debug!("starting movie list subscription");
            let live = self.store.subscribe();
            let store = self.store.clone();
            let snapshot = Arc::clone(&self.snapshot);
            sub.pump = Some(self.runtime.spawn(pump(store, live, snapshot)));
        }
    }

    fn detach(self: &Arc<Self>) {
        let mut sub = self.subscription();
        sub.consumers = sub.consumers.saturating_sub(1);
        if sub.consumers > 0 {
            return;
        }
        let inner = Arc::downgrade(self);
        let idle_timeout = self.idle_timeout;
        let epoch = sub.epoch;
        sub.teardown = Some(self.runtime.spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            if let Some(inner) = Weak::upgrade(&inner) {
                inner.teardown_if_idle(epoch);
            }
        }));
    }

    fn teardown_if_idle(&self, epoch: u64) {
        let mut sub = self.subscription();
        if sub.consumers > 0 || sub.epoch != epoch {
            return;
        }
        sub.teardown = None;
        if let Some(pump) = sub.pump.take() {
            log::debug!("movie list subscription idle; tearing down");
            pump.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let sub = self
            .subscription
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pump) = sub.pump.take() {
            pump.abort();
        }
        if let Some(teardown) = sub.teardown.take() {
            teardown.abort();
        }
    }
}

/// Copy every emission of the live query into the snapshot until the task is
/// aborted. A failed query is re-opened after [`PUMP_RETRY_DELAY`], which
/// re-reads the full list.
async fn pump(store: MovieStore, mut live: LiveQuery, snapshot: Arc<watch::Sender<Snapshot>>) {
    loop {
        match live.next().await {
            Ok(movies) => {
                snapshot.send_replace(Arc::new(movies));
            }
            Err(err) => {
                log::error!("movie list query failed, retrying: {err}");
                tokio::time::sleep(PUMP_RETRY_DELAY).await;
                live = store.subscribe();
            }
        }
    }
}

/// View-state coordinator over a [`MovieStore`].
#[derive(Clone)]
pub struct MovieCoordinator {
    inner: Arc<Inner>,
}

impl MovieCoordinator {
    /// `runtime` is where the pump and every write run; the coordinator
    /// itself can be driven from synchronous code.
    pub fn new(store: MovieStore, runtime: Handle, idle_timeout: Duration) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self {
            inner: Arc::new(Inner {
                store,
                runtime,
                idle_timeout,
                snapshot: Arc::new(snapshot),
                subscription: Mutex::new(Subscription::default()),
            }),
        }
    }

    /// Attach a consumer. The returned watcher keeps the subscription alive
    /// until it is dropped.
    pub fn watch(&self) -> SnapshotWatcher {
        self.inner.attach();
        SnapshotWatcher {
            inner: Arc::clone(&self.inner),
            receiver: self.inner.snapshot.subscribe(),
        }
    }

    /// Latest snapshot. Empty until the first emission arrives.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Whether a pump task is currently feeding the snapshot.
    pub fn is_live(&self) -> bool {
        self.inner
            .subscription()
            .pump
            .as_ref()
            .is_some_and(|pump| !pump.is_finished())
    }

    /// Look a movie up in the cached snapshot without querying the store.
    pub fn get_movie_by_id(&self, id: i64) -> Option<Movie> {
        self.inner
            .snapshot
            .borrow()
            .iter()
            .find(|movie| movie.id == id)
            .cloned()
    }

    pub fn add_movie(&self, movie: NewMovie) -> Pending {
        let store = self.inner.store.clone();
        self.dispatch("add movie", async move { store.insert(movie).await.map(|_| ()) })
    }

    pub fn update_movie(&self, movie: Movie) -> Pending {
        let store = self.inner.store.clone();
        self.dispatch("update movie", async move { store.update(movie).await.map(|_| ()) })
    }

    pub fn delete_movie(&self, movie: Movie) -> Pending {
        let store = self.inner.store.clone();
        self.dispatch("delete movie", async move { store.delete(movie).await.map(|_| ()) })
    }

    /// Ask the store to flip the flag the caller currently sees. Two toggles
    /// of the same movie racing each other can both write the same value.
    pub fn toggle_favorite(&self, movie: &Movie) -> Pending {
        let store = self.inner.store.clone();
        let (id, is_favorite) = (movie.id, !movie.is_favorite);
        self.dispatch("toggle favorite", async move {
            store.set_favorite(id, is_favorite).await.map(|_| ())
        })
    }

    fn dispatch<F>(&self, action: &'static str, write: F) -> Pending
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let handle = self.inner.runtime.spawn(async move {
            let result = write.await;
            if let Err(err) = &result {
                log::warn!("{action} failed: {err}");
            }
            result
        });
        Pending { action, handle }
    }
}

/// Completion handle for a dispatched write. Dropping it does not cancel the
/// write.
pub struct Pending {
    action: &'static str,
    handle: JoinHandle<Result<(), StoreError>>,
}

impl Pending {
    /// Short description of the write, e.g. "delete movie".
    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<(), StoreError> {
        self.handle.await?
    }
}

/// A consumer's view of the snapshot. Holding one keeps the coordinator
/// subscribed to the store.
pub struct SnapshotWatcher {
    inner: Arc<Inner>,
    receiver: watch::Receiver<Snapshot>,
}

impl SnapshotWatcher {
    pub fn current(&self) -> Snapshot {
        self.receiver.borrow().clone()
    }

    /// Wait until a snapshot satisfies `predicate`, including the current one.
    pub async fn wait_for(&mut self, mut predicate: impl FnMut(&[Movie]) -> bool) -> Snapshot {
        if let Ok(movies) = self
            .receiver
            .wait_for(|movies| predicate(movies.as_slice()))
            .await
        {
            return movies.clone();
        }
        self.current()
    }
}

impl Drop for SnapshotWatcher {
    fn drop(&mut self) {
        self.inner.detach();
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::models::Rating;

    const WAIT: Duration = Duration::from_secs(2);

    fn coordinator(idle_timeout: Duration) -> (MovieStore, MovieCoordinator) {
        let store = MovieStore::open_in_memory().unwrap();
        let coordinator = MovieCoordinator::new(store.clone(), Handle::current(), idle_timeout);
        (store, coordinator)
    }

    fn movie(title: &str) -> NewMovie {
        NewMovie::new(title, "Sci-Fi", Rating::new(9).unwrap())
    }

    #[tokio::test]
    async fn snapshot_starts_empty() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        assert!(coordinator.snapshot().is_empty());
        assert!(!coordinator.is_live());
        assert_eq!(coordinator.get_movie_by_id(1), None);
    }

    #[tokio::test]
    async fn add_toggle_delete_flow() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();

        coordinator.add_movie(movie("Inception")).wait().await.unwrap();
        let snapshot = timeout(WAIT, watcher.wait_for(|m| m.len() == 1))
            .await
            .unwrap();
        let inception = snapshot[0].clone();
        assert!(inception.id >= 1);
        assert!(!inception.is_favorite);
        assert_eq!(inception.title, "Inception");

        coordinator.toggle_favorite(&inception).wait().await.unwrap();
        let snapshot = timeout(WAIT, watcher.wait_for(|m| m.first().is_some_and(|m| m.is_favorite)))
            .await
            .unwrap();
        assert_eq!(snapshot[0].id, inception.id);

        coordinator.delete_movie(snapshot[0].clone()).wait().await.unwrap();
        let snapshot = timeout(WAIT, watcher.wait_for(|m| m.is_empty()))
            .await
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn toggle_twice_restores_flag() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();
        coordinator.add_movie(movie("Arrival")).wait().await.unwrap();
        let original = timeout(WAIT, watcher.wait_for(|m| m.len() == 1)).await.unwrap()[0].clone();

        coordinator.toggle_favorite(&original).wait().await.unwrap();
        let flipped = timeout(WAIT, watcher.wait_for(|m| m[0].is_favorite)).await.unwrap()[0].clone();
        coordinator.toggle_favorite(&flipped).wait().await.unwrap();
        let restored = timeout(WAIT, watcher.wait_for(|m| !m[0].is_favorite)).await.unwrap()[0].clone();

        assert_eq!(restored, original);
    }

    #[tokio::test]
    async fn newest_movie_comes_first() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();

        coordinator.add_movie(movie("First")).wait().await.unwrap();
        coordinator.add_movie(movie("Second")).wait().await.unwrap();

        let snapshot = timeout(WAIT, watcher.wait_for(|m| m.len() == 2)).await.unwrap();
        assert_eq!(snapshot[0].title, "Second");
        assert!(snapshot[0].id > snapshot[1].id);
    }

    #[tokio::test]
    async fn update_keeps_id_and_changes_title() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();
        coordinator.add_movie(movie("Tenet")).wait().await.unwrap();
        let stored = timeout(WAIT, watcher.wait_for(|m| m.len() == 1)).await.unwrap()[0].clone();

        let renamed = Movie {
            title: "Tenet (Director's Cut)".into(),
            ..stored.clone()
        };
        coordinator.update_movie(renamed).wait().await.unwrap();

        let snapshot = timeout(WAIT, watcher.wait_for(|m| m[0].title != "Tenet"))
            .await
            .unwrap();
        assert_eq!(snapshot[0].id, stored.id);
        assert_eq!(snapshot[0].title, "Tenet (Director's Cut)");
    }

    #[tokio::test]
    async fn lookup_is_served_from_snapshot() {
        let (store, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();
        let id = store.insert(movie("Dune")).await.unwrap();
        timeout(WAIT, watcher.wait_for(|m| m.len() == 1)).await.unwrap();

        assert_eq!(coordinator.get_movie_by_id(id).unwrap().title, "Dune");
        assert_eq!(coordinator.get_movie_by_id(id + 1), None);
    }

    #[tokio::test]
    async fn writes_on_missing_rows_complete_without_error() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let ghost = Movie {
            id: 404,
            title: "Ghost".into(),
            genre: "None".into(),
            rating: Rating::MIN,
            is_favorite: false,
        };

        let pending = coordinator.delete_movie(ghost.clone());
        assert_eq!(pending.action(), "delete movie");
        pending.wait().await.unwrap();
        coordinator.update_movie(ghost.clone()).wait().await.unwrap();
        coordinator.toggle_favorite(&ghost).wait().await.unwrap();
    }

    #[tokio::test]
    async fn reattach_within_idle_window_reuses_subscription() {
        let (store, coordinator) = coordinator(Duration::from_millis(300));

        let watcher = coordinator.watch();
        assert!(coordinator.is_live());
        drop(watcher);

        sleep(Duration::from_millis(50)).await;
        let _again = coordinator.watch();
        sleep(Duration::from_millis(500)).await;

        assert!(coordinator.is_live());
        assert_eq!(store.live_query_count(), 1);
    }

    #[tokio::test]
    async fn idle_subscription_is_torn_down_and_snapshot_kept() {
        let (store, coordinator) = coordinator(Duration::from_millis(50));
        let mut watcher = coordinator.watch();
        coordinator.add_movie(movie("Heat")).wait().await.unwrap();
        timeout(WAIT, watcher.wait_for(|m| m.len() == 1)).await.unwrap();
        drop(watcher);

        sleep(Duration::from_millis(300)).await;
        assert!(!coordinator.is_live());
        assert_eq!(coordinator.snapshot().len(), 1);

        let _watcher = coordinator.watch();
        assert!(coordinator.is_live());
        assert_eq!(store.live_query_count(), 2);
    }

    #[tokio::test]
    async fn failed_write_is_reported_by_pending() {
        let (store, coordinator) = coordinator(Duration::from_secs(5));
        store.execute_batch("DROP TABLE movie").await.unwrap();

        let pending = coordinator.add_movie(movie("Heat"));
        assert_eq!(pending.action(), "add movie");
        assert!(matches!(pending.wait().await, Err(StoreError::Storage(_))));
    }

    #[tokio::test]
    async fn pump_recovers_after_failed_query() {
        let (store, coordinator) = coordinator(Duration::from_secs(5));
        let mut watcher = coordinator.watch();
        coordinator.add_movie(movie("Heat")).wait().await.unwrap();
        timeout(WAIT, watcher.wait_for(|m| m.len() == 1)).await.unwrap();

        // An unparseable rating makes the next re-read fail.
        store
            .execute_batch("UPDATE movie SET rating = 'eleven'")
            .await
            .unwrap();
        coordinator.add_movie(movie("Ronin")).wait().await.unwrap();
        sleep(Duration::from_millis(100)).await;
        assert!(coordinator.is_live());
        assert_eq!(coordinator.snapshot().len(), 1);

        store
            .execute_batch("UPDATE movie SET rating = '8' WHERE rating = 'eleven'")
            .await
            .unwrap();
        let snapshot = timeout(Duration::from_secs(5), watcher.wait_for(|m| m.len() == 2))
            .await
            .unwrap();
        assert_eq!(snapshot[0].title, "Ronin");
    }

    #[tokio::test]
    async fn stale_teardown_timer_leaves_subscription_running() {
        let (_, coordinator) = coordinator(Duration::from_secs(5));
        let epoch = |coordinator: &MovieCoordinator| coordinator.inner.subscription().epoch;

        drop(coordinator.watch());
        let stale = epoch(&coordinator);
        drop(coordinator.watch());
        let current = epoch(&coordinator);

        coordinator.inner.teardown_if_idle(stale);
        assert!(coordinator.is_live());
        assert!(coordinator.inner.subscription().teardown.is_some());

        coordinator.inner.teardown_if_idle(current);
        assert!(!coordinator.is_live());
    }

    #[tokio::test]
    async fn multiple_consumers_share_one_subscription() {
        let (store, coordinator) = coordinator(Duration::from_millis(50));
        let first = coordinator.watch();
        let second = coordinator.watch();
        drop(first);

        sleep(Duration::from_millis(200)).await;
        assert!(coordinator.is_live());
        assert_eq!(store.live_query_count(), 1);
        drop(second);
    }
}
