//! Domain models that mirror the `movie` table and get passed between the
//! store, the coordinator, and the TUI. They stay plain data holders; the only
//! behavior here is rating validation and the share text.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::error::StoreError;

/// Text form of every allowed rating, indexed by `value - 1`.
const RATING_LABELS: [&str; 10] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"];

/// A movie rating picked from the fixed 1-10 scale. Persisted as TEXT so the
/// column keeps the same shape as the original data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Rating = Rating(1);
    pub const MAX: Rating = Rating(10);

    /// Build a rating from its numeric value.
    pub fn new(value: u8) -> Result<Self, StoreError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(StoreError::InvalidRating(value.to_string()))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn as_str(self) -> &'static str {
        RATING_LABELS[usize::from(self.0 - 1)]
    }

    /// Step up the picker, stopping at 10.
    pub fn next(self) -> Self {
        Rating(self.0.saturating_add(1).min(Self::MAX.0))
    }

    /// Step down the picker, stopping at 1.
    pub fn previous(self) -> Self {
        Rating(self.0.saturating_sub(1).max(Self::MIN.0))
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(5)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RATING_LABELS
            .iter()
            .position(|label| *label == s)
            .map(|idx| Rating(idx as u8 + 1))
            .ok_or_else(|| StoreError::InvalidRating(s.to_string()))
    }
}

impl ToSql for Rating {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Rating {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// An add request. The store assigns the id when it persists the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub genre: String,
    pub rating: Rating,
    pub is_favorite: bool,
}

impl NewMovie {
    /// A not-yet-favorited movie, the state every add form produces.
    pub fn new(title: impl Into<String>, genre: impl Into<String>, rating: Rating) -> Self {
        Self {
            title: title.into(),
            genre: genre.into(),
            rating,
            is_favorite: false,
        }
    }
}

/// A persisted movie row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    /// Assigned by the store on insert and never changed afterwards. Update,
    /// delete, and favorite flows all address the row through it.
    pub id: i64,
    pub title: String,
    pub genre: String,
    pub rating: Rating,
    pub is_favorite: bool,
}

impl Movie {
    /// Recommendation text handed to the clipboard by the share action.
    pub fn share_text(&self) -> String {
        share_text(&self.title, &self.genre, self.rating)
    }
}

/// Format a recommendation for values that may not be saved yet, such as the
/// contents of an open edit form.
pub fn share_text(title: &str, genre: &str, rating: Rating) -> String {
    format!("I recommend this movie: {title} ({genre}) - Rating: {rating}/10")
}
