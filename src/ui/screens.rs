use crate::coordinator::{Snapshot, SnapshotWatcher};
use crate::models::{Movie, NewMovie};

use super::forms::MovieForm;

/// The movie list. Holding the watcher keeps the coordinator subscribed while
/// the list is on screen.
pub(crate) struct ListScreen {
    pub(crate) watcher: SnapshotWatcher,
    pub(crate) selected: usize,
}

impl ListScreen {
    pub(crate) fn new(watcher: SnapshotWatcher, selected: usize) -> Self {
        Self { watcher, selected }
    }

    pub(crate) fn movies(&self) -> Snapshot {
        self.watcher.current()
    }

    /// Selected index clamped to the current snapshot, which may have shrunk
    /// since the selection was made.
    pub(crate) fn selected_index(&self, len: usize) -> usize {
        self.selected.min(len.saturating_sub(1))
    }

    pub(crate) fn current_movie(&self) -> Option<Movie> {
        let movies = self.movies();
        movies.get(self.selected_index(movies.len())).cloned()
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let len = self.movies().len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        let current = self.selected_index(len) as isize;
        self.selected = (current + offset).clamp(0, len as isize - 1) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.movies().len().saturating_sub(1);
    }
}

/// Whether the form creates a movie or edits an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FormTarget {
    Add,
    /// Favorite state is carried through so saving an edit keeps it.
    Edit { id: i64, is_favorite: bool },
}

/// The add/edit screen.
pub(crate) struct FormScreen {
    pub(crate) target: FormTarget,
    pub(crate) form: MovieForm,
}

/// What saving the form asks the coordinator to do.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FormSubmission {
    Add(NewMovie),
    Update(Movie),
}

impl FormScreen {
    pub(crate) fn add() -> Self {
        Self {
            target: FormTarget::Add,
            form: MovieForm::default(),
        }
    }

    pub(crate) fn edit(movie: &Movie) -> Self {
        Self {
            target: FormTarget::Edit {
                id: movie.id,
                is_favorite: movie.is_favorite,
            },
            form: MovieForm::from_movie(movie),
        }
    }

    pub(crate) fn heading(&self) -> &'static str {
        match self.target {
            FormTarget::Add => "Add Movie",
            FormTarget::Edit { .. } => "Edit Movie",
        }
    }

    /// Validate the form and describe the write it should trigger.
    pub(crate) fn submission(&self) -> anyhow::Result<FormSubmission> {
        let (title, genre, rating) = self.form.parse_inputs()?;
        Ok(match self.target {
            FormTarget::Add => FormSubmission::Add(NewMovie::new(title, genre, rating)),
            FormTarget::Edit { id, is_favorite } => FormSubmission::Update(Movie {
                id,
                title,
                genre,
                rating,
                is_favorite,
            }),
        })
    }

    /// The record a delete from this screen refers to, if it is an edit.
    pub(crate) fn editing_movie(&self) -> Option<Movie> {
        match self.target {
            FormTarget::Add => None,
            FormTarget::Edit { id, is_favorite } => Some(Movie {
                id,
                title: self.form.title.clone(),
                genre: self.form.genre.clone(),
                rating: self.form.rating,
                is_favorite,
            }),
        }
    }
}
