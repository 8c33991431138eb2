use anyhow::{Context, Error, Result};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::models::Movie;

use super::theme::Palette;

/// Marker shown next to favorited movies.
const FAVORITE_MARK: &str = "★";
const NOT_FAVORITE_MARK: &str = "☆";

/// Text lines for one movie card in the list.
pub(crate) fn movie_card_lines(movie: &Movie, selected: bool, palette: &Palette) -> Vec<Line<'static>> {
    let (mark, mark_style) = if movie.is_favorite {
        (FAVORITE_MARK, Style::default().fg(palette.primary))
    } else {
        (NOT_FAVORITE_MARK, palette.muted())
    };
    let title = if selected {
        format!("▶ {}", movie.title)
    } else {
        movie.title.clone()
    };

    vec![
        Line::from(vec![
            Span::styled(format!("{mark} "), mark_style),
            Span::styled(title, Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(format!("Genre: {}", movie.genre), palette.muted())),
        Line::from(format!("Rating: {}/10", movie.rating)),
    ]
}

/// First index to draw so that `selected` stays visible in a window of
/// `capacity` rows.
pub(crate) fn scroll_start(selected: usize, capacity: usize, len: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    let start = (selected + 1).saturating_sub(capacity);
    start.min(len.saturating_sub(capacity))
}

/// Terminal column for a text cursor sitting `offset` cells into `area`,
/// kept inside the area when the text is wider than it.
pub(crate) fn cursor_column(area: Rect, offset: usize) -> u16 {
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);
    let last = area.right().saturating_sub(1).max(area.x);
    area.x.saturating_add(offset).min(last)
}

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1])[1]
}

/// Put share text on the system clipboard.
pub(crate) fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard is not available")?;
    clipboard
        .set_text(text.to_string())
        .context("failed to copy to clipboard")
}

/// Extract the most relevant error message from a chained error.
pub(crate) fn surface_error(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::config::ThemeMode;
    use crate::models::Rating;

    #[test]
    fn scroll_keeps_selection_visible() {
        assert_eq!(scroll_start(0, 3, 10), 0);
        assert_eq!(scroll_start(2, 3, 10), 0);
        assert_eq!(scroll_start(3, 3, 10), 1);
        assert_eq!(scroll_start(9, 3, 10), 7);
        assert_eq!(scroll_start(1, 5, 2), 0);
        assert_eq!(scroll_start(4, 0, 10), 0);
    }

    #[test]
    fn cursor_stays_inside_area() {
        let area = Rect::new(2, 1, 20, 3);
        assert_eq!(cursor_column(area, 7), 9);
        assert_eq!(cursor_column(area, 19), 21);
        assert_eq!(cursor_column(area, 500), 21);
        assert_eq!(cursor_column(area, usize::MAX), 21);
        assert_eq!(cursor_column(Rect::new(u16::MAX - 3, 0, 3, 1), 100_000), u16::MAX - 1);
    }

    #[test]
    fn card_shows_rating_out_of_ten_and_favorite_mark() {
        let movie = Movie {
            id: 1,
            title: "Heat".into(),
            genre: "Crime".into(),
            rating: Rating::new(8).unwrap(),
            is_favorite: true,
        };
        let palette = Palette::for_mode(ThemeMode::Dark);
        let text: Vec<String> = movie_card_lines(&movie, true, &palette)
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert_eq!(text, ["★ ▶ Heat", "Genre: Crime", "Rating: 8/10"]);
    }

    #[test]
    fn surface_error_prefers_root_cause() {
        let err = anyhow!("disk full").context("failed to save");
        assert_eq!(surface_error(&err), "disk full");
    }
}
