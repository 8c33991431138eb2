use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use tokio::runtime::Handle;

use crate::config::ThemeMode;
use crate::coordinator::{MovieCoordinator, Pending};
use crate::models::Movie;

use super::forms::{ConfirmMovieDelete, MovieField};
use super::helpers::{
    centered_rect, copy_to_clipboard, cursor_column, movie_card_lines, scroll_start,
    surface_error,
};
use super::screens::{FormScreen, FormSubmission, ListScreen};
use super::theme::Palette;

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of one movie card: three text lines plus borders.
const MOVIE_CARD_HEIGHT: u16 = 5;
/// Rows skipped by PageUp/PageDown.
const PAGE_STEP: isize = 5;

/// The three views of the app. The form covers both adding and editing.
enum Screen {
    List(ListScreen),
    Form(FormScreen),
}

/// Overlays on top of the current screen.
enum Mode {
    Normal,
    ConfirmDelete(ConfirmMovieDelete),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self, palette: &Palette) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(palette.info),
            StatusKind::Error => Style::default().fg(palette.error),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    coordinator: MovieCoordinator,
    runtime: Handle,
    screen: Screen,
    mode: Mode,
    theme: ThemeMode,
    status: Option<StatusMessage>,
    /// List selection remembered while the form is open.
    list_selection: usize,
    in_flight: Vec<Pending>,
}

impl App {
    /// `runtime` must be the handle the coordinator dispatches onto; it is
    /// used to collect the results of finished writes.
    pub fn new(coordinator: MovieCoordinator, runtime: Handle, theme: ThemeMode) -> Self {
        let list = ListScreen::new(coordinator.watch(), 0);
        Self {
            coordinator,
            runtime,
            screen: Screen::List(list),
            mode: Mode::Normal,
            theme,
            status: None,
            list_selection: 0,
            in_flight: Vec::new(),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::Normal => match self.screen {
                Screen::List(_) => self.handle_list_key(code, &mut exit)?,
                Screen::Form(_) => self.handle_form_key(code)?,
            },
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
        };

        Ok(exit)
    }

    fn handle_list_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::List(list) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up => list.move_selection(-1),
            KeyCode::Down => list.move_selection(1),
            KeyCode::PageUp => list.move_selection(-PAGE_STEP),
            KeyCode::PageDown => list.move_selection(PAGE_STEP),
            KeyCode::Home => list.select_first(),
            KeyCode::End => list.select_last(),
            KeyCode::Char('+') | KeyCode::Char('a') | KeyCode::Char('A') => {
                self.clear_status();
                self.open_form(FormScreen::add());
            }
            KeyCode::Enter | KeyCode::Char('e') | KeyCode::Char('E') => {
                match list.current_movie() {
                    Some(movie) => self.open_editor(movie.id),
                    None => self.set_status("No movie selected to edit.", StatusKind::Error),
                }
            }
            KeyCode::Char('f') | KeyCode::Char('F') => match list.current_movie() {
                Some(movie) => {
                    let pending = self.coordinator.toggle_favorite(&movie);
                    self.track(pending);
                    let verb = if movie.is_favorite { "Removed" } else { "Added" };
                    let direction = if movie.is_favorite { "from" } else { "to" };
                    self.set_status(
                        format!("{verb} \"{}\" {direction} favorites.", movie.title),
                        StatusKind::Info,
                    );
                }
                None => self.set_status("No movie selected.", StatusKind::Error),
            },
            KeyCode::Char('-') | KeyCode::Delete => match list.current_movie() {
                Some(movie) => {
                    self.clear_status();
                    return Ok(Mode::ConfirmDelete(ConfirmMovieDelete { movie }));
                }
                None => self.set_status("No movie selected to delete.", StatusKind::Error),
            },
            KeyCode::Char('s') | KeyCode::Char('S') => match list.current_movie() {
                Some(movie) => self.share(&movie.share_text()),
                None => self.set_status("No movie selected to share.", StatusKind::Error),
            },
            KeyCode::Char('t') | KeyCode::Char('T') => self.toggle_theme(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form_key(&mut self, code: KeyCode) -> Result<Mode> {
        let Screen::Form(screen) = &mut self.screen else {
            return Ok(Mode::Normal);
        };
        let form = &mut screen.form;

        match code {
            KeyCode::Esc => {
                self.set_status("Changes discarded.", StatusKind::Info);
                self.return_to_list();
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Left => {
                form.step_rating(false);
            }
            KeyCode::Right => {
                form.step_rating(true);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => self.save_form(),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_confirm_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmMovieDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let pending = self.coordinator.delete_movie(confirm.movie.clone());
                self.track(pending);
                if matches!(self.screen, Screen::Form(_)) {
                    self.return_to_list();
                }
                self.set_status(
                    format!("Deleted \"{}\".", confirm.movie.title),
                    StatusKind::Info,
                );
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    /// Ctrl+D: delete the movie open in the editor.
    pub(crate) fn handle_ctrl_d(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        if let Screen::Form(screen) = &self.screen {
            match screen.editing_movie() {
                Some(movie) => self.mode = Mode::ConfirmDelete(ConfirmMovieDelete { movie }),
                None => self.set_status("Nothing to delete yet.", StatusKind::Error),
            }
        }
        Ok(())
    }

    /// Ctrl+S: share whatever the editor currently shows.
    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        if let Screen::Form(screen) = &self.screen {
            let text = screen.form.share_text();
            self.share(&text);
        }
        Ok(())
    }

    /// Collect writes that have finished and report any that failed.
    pub(crate) fn reap_writes(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = mem::take(&mut self.in_flight)
            .into_iter()
            .partition(Pending::is_finished);
        self.in_flight = running;

        for pending in finished {
            let action = pending.action();
            if let Err(err) = self.runtime.block_on(pending.wait()) {
                self.set_status(format!("Could not {action}: {err}"), StatusKind::Error);
            }
        }
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let palette = Palette::for_mode(self.theme);
        let area = frame.area();
        frame.render_widget(Block::default().style(palette.base()), area);

        let footer_height = FOOTER_HEIGHT.min(area.height);
        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::List(list) => self.draw_list(frame, content_area, list, &palette),
            Screen::Form(screen) => self.draw_form(frame, content_area, screen, &palette),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area, &palette);
        }

        if let Mode::ConfirmDelete(confirm) = &self.mode {
            self.draw_confirm_delete(frame, area, confirm, &palette);
        }
    }

    fn draw_list(&self, frame: &mut Frame, area: Rect, list: &ListScreen, palette: &Palette) {
        let movies = list.movies();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Movies ({}) ", movies.len()))
            .border_style(Style::default().fg(palette.primary));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if movies.is_empty() {
            let empty = Paragraph::new(vec![
                Line::from("No movies yet."),
                Line::from("Press + to add!"),
            ])
            .alignment(Alignment::Center)
            .style(palette.muted());
            let middle = inner.height / 2;
            let text_area = Rect {
                y: inner.y + middle.saturating_sub(1),
                height: inner.height.min(2),
                ..inner
            };
            frame.render_widget(empty, text_area);
            return;
        }

        self.render_movie_cards(frame, inner, &movies, list.selected_index(movies.len()), palette);
    }

    fn render_movie_cards(
        &self,
        frame: &mut Frame,
        area: Rect,
        movies: &[Movie],
        selected: usize,
        palette: &Palette,
    ) {
        if area.height == 0 {
            return;
        }

        let capacity = ((area.height / MOVIE_CARD_HEIGHT) as usize).max(1);
        let start = scroll_start(selected, capacity, movies.len());
        let visible = &movies[start..movies.len().min(start + capacity)];

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Length(MOVIE_CARD_HEIGHT); visible.len()])
            .split(area);

        for (offset, (movie, chunk)) in visible.iter().zip(rows.iter()).enumerate() {
            let is_selected = start + offset == selected;
            let (block_style, border_style) = if is_selected {
                (palette.highlight(), Style::default().fg(palette.primary))
            } else {
                (palette.card(), palette.muted())
            };
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .style(block_style);
            let paragraph = Paragraph::new(movie_card_lines(movie, is_selected, palette))
                .block(block)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, *chunk);
        }
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, screen: &FormScreen, palette: &Palette) {
        let block = Block::default()
            .title(format!(" {} ", screen.heading()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.primary))
            .style(palette.card());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let form = &screen.form;
        let mut lines = vec![
            form.build_line("Title", MovieField::Title, palette),
            form.build_line("Genre", MovieField::Genre, palette),
            form.build_line("Rating", MovieField::Rating, palette),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(palette.error),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch field • ←/→ to change rating • Esc to cancel",
                palette.muted(),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        let cursor = match form.active {
            MovieField::Title => Some(("Title: ", 0)),
            MovieField::Genre => Some(("Genre: ", 1)),
            MovieField::Rating => None,
        };
        if let Some((prefix, row)) = cursor {
            let x = cursor_column(inner, prefix.len() + form.value_len(form.active));
            frame.set_cursor_position((x, inner.y + row));
        }
    }

    fn draw_confirm_delete(
        &self,
        frame: &mut Frame,
        area: Rect,
        confirm: &ConfirmMovieDelete,
        palette: &Palette,
    ) {
        let popup_area = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(" Delete Movie ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.error))
            .style(palette.card());
        let paragraph = Paragraph::new(vec![
            Line::from(format!("Delete \"{}\"?", confirm.movie.title)),
            Line::from(""),
            Line::from(Span::styled("y to confirm • n to cancel", palette.muted())),
        ])
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect, palette: &Palette) {
        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let status_line = match &self.status {
            Some(status) => Line::from(Span::styled(status.text.clone(), status.kind.style(palette))),
            None => Line::from(""),
        };

        let paragraph = Paragraph::new(vec![status_line, self.footer_instructions(palette)])
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self, palette: &Palette) -> Line<'static> {
        let key_style = palette.key();
        let pairs: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::ConfirmDelete(_)) => &[("[y]", " Delete   "), ("[n]", " Keep")],
            (Screen::List(_), Mode::Normal) => &[
                ("[↑↓]", " Navigate   "),
                ("[+]", " Add   "),
                ("[Enter]", " Edit   "),
                ("[f]", " Favorite   "),
                ("[-]", " Delete   "),
                ("[s]", " Share   "),
                ("[t]", " Theme   "),
                ("[q]", " Quit"),
            ],
            (Screen::Form(_), Mode::Normal) => &[
                ("[Enter]", " Save   "),
                ("[Ctrl+S]", " Share   "),
                ("[Ctrl+D]", " Delete   "),
                ("[Esc]", " Cancel"),
            ],
        };

        Line::from(
            pairs
                .iter()
                .flat_map(|(key, label)| {
                    [
                        Span::styled(key.to_string(), key_style),
                        Span::raw(label.to_string()),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn save_form(&mut self) {
        let Screen::Form(screen) = &mut self.screen else {
            return;
        };
        let submission = match screen.submission() {
            Ok(submission) => submission,
            Err(err) => {
                let message = surface_error(&err);
                screen.form.error = Some(message.clone());
                self.set_status(message, StatusKind::Error);
                return;
            }
        };

        let (pending, message) = match submission {
            FormSubmission::Add(movie) => {
                let message = format!("Added \"{}\".", movie.title);
                // Newest movies are listed first.
                self.list_selection = 0;
                (self.coordinator.add_movie(movie), message)
            }
            FormSubmission::Update(movie) => {
                let message = format!("Updated \"{}\".", movie.title);
                (self.coordinator.update_movie(movie), message)
            }
        };
        self.track(pending);
        self.return_to_list();
        self.set_status(message, StatusKind::Info);
    }

    fn open_editor(&mut self, id: i64) {
        match self.coordinator.get_movie_by_id(id) {
            Some(movie) => {
                self.clear_status();
                self.open_form(FormScreen::edit(&movie));
            }
            None => self.set_status("That movie no longer exists.", StatusKind::Error),
        }
    }

    /// Swap the list for a form. Dropping the list releases its watcher, and
    /// the coordinator keeps the subscription warm until we come back.
    fn open_form(&mut self, form: FormScreen) {
        if let Screen::List(list) = &self.screen {
            self.list_selection = list.selected;
        }
        self.screen = Screen::Form(form);
    }

    fn return_to_list(&mut self) {
        self.screen = Screen::List(ListScreen::new(
            self.coordinator.watch(),
            self.list_selection,
        ));
    }

    fn share(&mut self, text: &str) {
        match copy_to_clipboard(text) {
            Ok(()) => self.set_status(format!("Copied to clipboard: {text}"), StatusKind::Info),
            Err(err) => {
                log::warn!("share failed: {err:#}");
                self.set_status(surface_error(&err), StatusKind::Error);
            }
        }
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let name = match self.theme {
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        };
        self.set_status(format!("Switched to {name} theme."), StatusKind::Info);
    }

    fn track(&mut self, pending: Pending) {
        self.in_flight.push(pending);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }
}
