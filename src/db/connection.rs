use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::StoreError;

/// Name of the single table holding movie rows.
pub const MOVIE_TABLE: &str = "movie";
/// Version tag written to `PRAGMA user_version`. Any other tag found on disk
/// causes the table to be dropped and recreated.
pub const SCHEMA_VERSION: i32 = 2;
/// Column layout the rest of the crate expects, in table order.
pub const MOVIE_COLUMNS: [&str; 5] = ["id", "title", "genre", "rating", "isFavorite"];

/// Definition of the `movie` table. A stored table whose `CREATE TABLE` text
/// differs from this (ignoring whitespace) counts as a shape mismatch.
fn create_table_sql() -> String {
    format!(
        "CREATE TABLE {MOVIE_TABLE} (
             id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
             title TEXT NOT NULL,
             genre TEXT NOT NULL,
             rating TEXT NOT NULL,
             isFavorite INTEGER NOT NULL DEFAULT 0
         )"
    )
}

/// What `open_database` had to do to get a usable table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOutcome {
    /// Fresh file; the table was created.
    Created,
    /// Existing table matched the expected version and shape.
    Reused,
    /// Version or shape mismatch. Every existing row was discarded.
    Recreated { previous_version: i32 },
}

/// Open (or create) the database file, take an exclusive lock on it, and make
/// sure the `movie` table has the current shape.
pub fn open_database(path: &Path) -> Result<(Connection, SchemaOutcome), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let conn = Connection::open(path)?;
    // In exclusive locking mode the lock taken by this empty write transaction
    // is kept until the connection closes.
    conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
        row.get::<_, String>(0)
    })?;
    conn.execute_batch("BEGIN EXCLUSIVE; COMMIT;")?;

    let outcome = ensure_schema(&conn)?;
    log::info!("opened movie database at {} ({outcome:?})", path.display());
    Ok((conn, outcome))
}

/// In-memory database with the current schema, used by tests.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    ensure_schema(&conn)?;
    Ok(conn)
}

fn ensure_schema(conn: &Connection) -> Result<SchemaOutcome, StoreError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    let stored = stored_table_sql(conn)?;

    let Some(stored) = stored else {
        recreate_table(conn)?;
        return Ok(if version == 0 {
            SchemaOutcome::Created
        } else {
            SchemaOutcome::Recreated {
                previous_version: version,
            }
        });
    };

    let shape_matches = normalize_sql(&stored) == normalize_sql(&create_table_sql());
    if version == SCHEMA_VERSION && shape_matches {
        return Ok(SchemaOutcome::Reused);
    }

    log::warn!(
        "movie schema mismatch (found version {version}, table definition {}); \
         discarding stored movies and recreating the table",
        if shape_matches { "matches" } else { "differs" }
    );
    recreate_table(conn)?;
    Ok(SchemaOutcome::Recreated {
        previous_version: version,
    })
}

/// The `CREATE TABLE` text SQLite kept for the `movie` table, if it exists.
fn stored_table_sql(conn: &Connection) -> Result<Option<String>, StoreError> {
    let sql = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [MOVIE_TABLE],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(sql)
}

fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn recreate_table(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(&format!(
        "BEGIN;
         DROP TABLE IF EXISTS {MOVIE_TABLE};
         {};
         PRAGMA user_version = {SCHEMA_VERSION};
         COMMIT;",
        create_table_sql()
    ))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{delete_movie, insert_movie};
    use crate::models::{NewMovie, Rating};

    fn table_columns(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({MOVIE_TABLE})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn fresh_file_creates_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("movies.sqlite");

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(outcome, SchemaOutcome::Created);
        assert_eq!(table_columns(&conn), MOVIE_COLUMNS);
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn matching_schema_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.sqlite");
        {
            let (conn, _) = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO movie (title, genre, rating) VALUES ('Heat', 'Crime', '8')",
                [],
            )
            .unwrap();
        }

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(outcome, SchemaOutcome::Reused);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM movie", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn version_mismatch_discards_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.sqlite");
        {
            let (conn, _) = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO movie (title, genre, rating) VALUES ('Heat', 'Crime', '8')",
                [],
            )
            .unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
        }

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(
            outcome,
            SchemaOutcome::Recreated {
                previous_version: 1
            }
        );
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM movie", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn unexpected_columns_trigger_recreate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE movie (id INTEGER PRIMARY KEY, name TEXT);
                 PRAGMA user_version = 2;",
            )
            .unwrap();
        }

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(
            outcome,
            SchemaOutcome::Recreated {
                previous_version: SCHEMA_VERSION
            }
        );
        assert_eq!(table_columns(&conn), MOVIE_COLUMNS);
    }

    #[test]
    fn same_columns_without_autoincrement_trigger_recreate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE movie (
                     id INTEGER PRIMARY KEY,
                     title TEXT,
                     genre TEXT,
                     rating TEXT,
                     isFavorite INTEGER
                 );
                 INSERT INTO movie (title, genre, rating, isFavorite)
                     VALUES ('Heat', 'Crime', '8', 0);
                 PRAGMA user_version = 2;",
            )
            .unwrap();
        }

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(
            outcome,
            SchemaOutcome::Recreated {
                previous_version: SCHEMA_VERSION
            }
        );
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM movie", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let movie = NewMovie::new("Ronin", "Action", Rating::new(7).unwrap());
        let first = insert_movie(&conn, &movie).unwrap();
        delete_movie(&conn, first).unwrap();
        let second = insert_movie(&conn, &movie).unwrap();
        assert!(second > first, "id {first} was handed out twice");
    }

    #[test]
    fn table_missing_under_current_version_is_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION).unwrap();
        }

        let (conn, outcome) = open_database(&path).unwrap();

        assert_eq!(
            outcome,
            SchemaOutcome::Recreated {
                previous_version: SCHEMA_VERSION
            }
        );
        assert_eq!(table_columns(&conn), MOVIE_COLUMNS);
    }
}
