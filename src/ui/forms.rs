use anyhow::{anyhow, Result};
use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::models::{share_text, Movie, Rating};

use super::theme::Palette;

/// Input state behind the add/edit screen.
#[derive(Default, Clone)]
pub(crate) struct MovieForm {
    pub(crate) title: String,
    pub(crate) genre: String,
    pub(crate) rating: Rating,
    pub(crate) active: MovieField,
    pub(crate) error: Option<String>,
}

/// Fields available within the movie form, in focus order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum MovieField {
    #[default]
    Title,
    Genre,
    Rating,
}

impl MovieForm {
    /// Populate the form from an existing movie when editing.
    pub(crate) fn from_movie(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            genre: movie.genre.clone(),
            rating: movie.rating,
            active: MovieField::Title,
            error: None,
        }
    }

    pub(crate) fn next_field(&mut self) {
        self.active = match self.active {
            MovieField::Title => MovieField::Genre,
            MovieField::Genre => MovieField::Rating,
            MovieField::Rating => MovieField::Title,
        };
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            MovieField::Title => MovieField::Rating,
            MovieField::Genre => MovieField::Title,
            MovieField::Rating => MovieField::Genre,
        };
    }

    /// Append a character to the active text field. The rating is a picker,
    /// so typing while it has focus is ignored.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            MovieField::Title => self.title.push(ch),
            MovieField::Genre => self.genre.push(ch),
            MovieField::Rating => return false,
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            MovieField::Title => {
                self.title.pop();
            }
            MovieField::Genre => {
                self.genre.pop();
            }
            MovieField::Rating => {}
        }
    }

    /// Move the rating picker when it has focus. Returns whether it moved.
    pub(crate) fn step_rating(&mut self, up: bool) -> bool {
        if self.active != MovieField::Rating {
            return false;
        }
        let stepped = if up {
            self.rating.next()
        } else {
            self.rating.previous()
        };
        let moved = stepped != self.rating;
        self.rating = stepped;
        moved
    }

    /// Validate the inputs and return trimmed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, Rating)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Movie title is required."));
        }
        Ok((title.to_string(), self.genre.trim().to_string(), self.rating))
    }

    /// Recommendation text for whatever the form currently holds.
    pub(crate) fn share_text(&self) -> String {
        share_text(self.title.trim(), self.genre.trim(), self.rating)
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(
        &self,
        field_name: &str,
        field: MovieField,
        palette: &Palette,
    ) -> Line<'static> {
        let is_active = self.active == field;
        let (display, is_empty) = match field {
            MovieField::Title => (self.title.clone(), self.title.is_empty()),
            MovieField::Genre => (self.genre.clone(), self.genre.is_empty()),
            MovieField::Rating => (format!("< {} >  (1-10)", self.rating), false),
        };
        let display = if is_empty {
            match field {
                MovieField::Title => "<required>".to_string(),
                _ => "<optional>".to_string(),
            }
        } else {
            display
        };

        let style = if is_active {
            Style::default().fg(palette.primary)
        } else if is_empty {
            palette.muted()
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    /// Return the character count for the requested text field.
    pub(crate) fn value_len(&self, field: MovieField) -> usize {
        match field {
            MovieField::Title => self.title.chars().count(),
            MovieField::Genre => self.genre.chars().count(),
            MovieField::Rating => 0,
        }
    }
}

/// Pending delete awaiting a y/n answer.
#[derive(Clone)]
pub(crate) struct ConfirmMovieDelete {
    pub(crate) movie: Movie,
}
