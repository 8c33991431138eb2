//! The persistent movie store: async CRUD over the `movie` table plus a live
//! query that re-emits the ordered list after every change.
//!
//! A store is built once with [`MovieStore::open`] and then shared by cloning
//! the handle. All clones talk to the same connection. SQLite calls run on
//! tokio's blocking pool behind a mutex, so writes are serialized and each one
//! is visible to the live query before the next write starts.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tokio::sync::watch;
use tokio::task;

use crate::db::{self, SchemaOutcome};
use crate::error::StoreError;
use crate::models::{Movie, NewMovie};

struct Shared {
    conn: Mutex<Connection>,
    /// Bumped inside the connection lock after every write that changed rows.
    generation: watch::Sender<u64>,
    live_queries: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Handle to the movie database.
#[derive(Clone)]
pub struct MovieStore {
    shared: Arc<Shared>,
}

impl MovieStore {
    /// Open the database file, applying the destructive schema policy from
    /// [`db::open_database`]. Holds an exclusive lock on the file for as long
    /// as any clone of the store is alive.
    pub fn open(path: &Path) -> Result<(Self, SchemaOutcome), StoreError> {
        let (conn, outcome) = db::open_database(path)?;
        Ok((Self::from_connection(conn), outcome))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                generation,
                live_queries: AtomicUsize::new(0),
            }),
        }
    }

    /// Current list of movies, newest first.
    pub async fn all(&self) -> Result<Vec<Movie>, StoreError> {
        self.read(db::fetch_movies).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Movie>, StoreError> {
        self.read(move |conn| db::fetch_movie(conn, id)).await
    }

    /// Persist a new movie and return its assigned id.
    pub async fn insert(&self, movie: NewMovie) -> Result<i64, StoreError> {
        self.write(move |conn| db::insert_movie(conn, &movie).map(|id| (id, 1)))
            .await
    }

    /// Returns whether a row with `movie.id` existed.
    pub async fn update(&self, movie: Movie) -> Result<bool, StoreError> {
        self.write(move |conn| db::update_movie(conn, &movie).map(|n| (n > 0, n)))
            .await
    }

    /// Returns whether a row with `movie.id` existed.
    pub async fn delete(&self, movie: Movie) -> Result<bool, StoreError> {
        self.write(move |conn| db::delete_movie(conn, movie.id).map(|n| (n > 0, n)))
            .await
    }

    /// Returns whether a row with `id` existed.
    pub async fn set_favorite(&self, id: i64, is_favorite: bool) -> Result<bool, StoreError> {
        self.write(move |conn| db::set_favorite(conn, id, is_favorite).map(|n| (n > 0, n)))
            .await
    }

    /// Open a live query over the full ordered list. Dropping the returned
    /// handle cancels it.
    pub fn subscribe(&self) -> LiveQuery {
        self.shared.live_queries.fetch_add(1, Ordering::Relaxed);
        LiveQuery {
            store: self.clone(),
            generation: self.shared.generation.subscribe(),
            primed: false,
        }
    }

    /// How many live queries have been opened over the store's lifetime.
    pub fn live_query_count(&self) -> usize {
        self.shared.live_queries.load(Ordering::Relaxed)
    }

    /// Run raw SQL behind the store's back. Does not wake live queries.
    #[cfg(test)]
    pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<(), StoreError> {
        self.read(move |conn| Ok(conn.execute_batch(sql)?)).await
    }

    async fn read<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        task::spawn_blocking(move || {
            let conn = shared.lock()?;
            op(&conn)
        })
        .await?
    }

    /// Run a write and, if it reports changed rows, publish a new generation
    /// before the connection lock is released.
    async fn write<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<(T, usize), StoreError> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        task::spawn_blocking(move || {
            let conn = shared.lock()?;
            let (value, changed) = op(&conn)?;
            if changed > 0 {
                shared.generation.send_modify(|generation| *generation += 1);
            }
            Ok(value)
        })
        .await?
    }
}

/// Push-style view of the ordered movie list.
pub struct LiveQuery {
    store: MovieStore,
    generation: watch::Receiver<u64>,
    primed: bool,
}

impl LiveQuery {
    /// The first call resolves immediately with the current list. Later calls
    /// wait for the next change and then re-run the query. Several writes that
    /// land while the caller is busy collapse into one emission carrying the
    /// latest state.
    pub async fn next(&mut self) -> Result<Vec<Movie>, StoreError> {
        if self.primed {
            // The sender lives in the store this query keeps alive, so this
            // only fails if the store itself is being torn down.
            self.generation
                .changed()
                .await
                .map_err(|_| StoreError::Closed)?;
        }
        self.generation.borrow_and_update();
        self.primed = true;
        self.store.all().await
    }
}
