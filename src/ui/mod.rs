//! Ratatui front-end: the movie list, the add/edit form, and the terminal
//! loop that drives them.

mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;
mod theme;

pub use app::App;
pub use terminal::run_app;
