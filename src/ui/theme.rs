use ratatui::style::{Color, Modifier, Style};

use crate::config::ThemeMode;

/// Colors used across every screen. Both schemes share the red accent so the
/// app keeps its identity when switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Palette {
    pub(crate) primary: Color,
    pub(crate) secondary: Color,
    pub(crate) background: Color,
    pub(crate) surface: Color,
    pub(crate) text: Color,
    pub(crate) muted: Color,
    pub(crate) error: Color,
    pub(crate) info: Color,
}

const DARK: Palette = Palette {
    primary: Color::Rgb(0xE5, 0x09, 0x14),
    secondary: Color::Rgb(0xB8, 0x1D, 0x24),
    background: Color::Rgb(0x12, 0x12, 0x12),
    surface: Color::Rgb(0x1E, 0x1E, 0x1E),
    text: Color::White,
    muted: Color::Gray,
    error: Color::LightRed,
    info: Color::LightGreen,
};

const LIGHT: Palette = Palette {
    primary: Color::Rgb(0xD3, 0x2F, 0x2F),
    secondary: Color::Rgb(0xF0, 0x62, 0x92),
    background: Color::Rgb(0xFD, 0xFD, 0xFD),
    surface: Color::White,
    text: Color::Black,
    muted: Color::DarkGray,
    error: Color::Red,
    info: Color::Green,
};

impl Palette {
    pub(crate) fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => DARK,
            ThemeMode::Light => LIGHT,
        }
    }

    pub(crate) fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    pub(crate) fn card(&self) -> Style {
        Style::default().fg(self.text).bg(self.surface)
    }

    pub(crate) fn highlight(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .bg(self.surface)
            .add_modifier(Modifier::BOLD)
    }

    pub(crate) fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub(crate) fn key(&self) -> Style {
        Style::default()
            .fg(self.secondary)
            .add_modifier(Modifier::BOLD)
    }
}
