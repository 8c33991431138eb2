use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::models::{Movie, NewMovie};

fn movie_from_row(row: &Row<'_>) -> rusqlite::Result<Movie> {
    Ok(Movie {
        id: row.get(0)?,
        title: row.get(1)?,
        genre: row.get(2)?,
        rating: row.get(3)?,
        is_favorite: row.get(4)?,
    })
}

/// Every movie, newest first. This ordering is what the list screen shows, so
/// the query is the single source of truth for it.
pub fn fetch_movies(conn: &Connection) -> Result<Vec<Movie>, StoreError> {
    let mut stmt =
        conn.prepare_cached("SELECT id, title, genre, rating, isFavorite FROM movie ORDER BY id DESC")?;

    let movies = stmt
        .query_map([], movie_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(movies)
}

/// Look up a single movie, or `None` when the id is unknown.
pub fn fetch_movie(conn: &Connection, id: i64) -> Result<Option<Movie>, StoreError> {
    let movie = conn
        .query_row(
            "SELECT id, title, genre, rating, isFavorite FROM movie WHERE id = ?1 LIMIT 1",
            [id],
            movie_from_row,
        )
        .optional()?;
    Ok(movie)
}

/// Insert a row and return the id SQLite assigned. `OR REPLACE` means a
/// conflicting row is overwritten instead of failing the insert.
pub fn insert_movie(conn: &Connection, movie: &NewMovie) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO movie (title, genre, rating, isFavorite) VALUES (?1, ?2, ?3, ?4)",
        params![movie.title, movie.genre, movie.rating, movie.is_favorite],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite every editable column of an existing row. Returns the number of
/// rows touched; an unknown id is not an error.
pub fn update_movie(conn: &Connection, movie: &Movie) -> Result<usize, StoreError> {
    let updated = conn.execute(
        "UPDATE movie SET title = ?1, genre = ?2, rating = ?3, isFavorite = ?4 WHERE id = ?5",
        params![movie.title, movie.genre, movie.rating, movie.is_favorite, movie.id],
    )?;
    Ok(updated)
}

pub fn delete_movie(conn: &Connection, id: i64) -> Result<usize, StoreError> {
    let deleted = conn.execute("DELETE FROM movie WHERE id = ?1", [id])?;
    Ok(deleted)
}

/// Flip only the favorite column, leaving the rest of the row alone.
pub fn set_favorite(conn: &Connection, id: i64, is_favorite: bool) -> Result<usize, StoreError> {
    let updated = conn.execute(
        "UPDATE movie SET isFavorite = ?1 WHERE id = ?2",
        params![is_favorite, id],
    )?;
    Ok(updated)
}
