//! Synchronous persistence helpers split across logical submodules. The async
//! `store` wraps these; nothing here knows about tasks or change tracking.

mod connection;
mod movies;

pub use connection::{
    open_database, open_in_memory, SchemaOutcome, MOVIE_COLUMNS, MOVIE_TABLE, SCHEMA_VERSION,
};
pub use movies::{delete_movie, fetch_movie, fetch_movies, insert_movie, set_favorite, update_movie};
