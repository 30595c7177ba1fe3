use ratatui::style::{Color, Modifier, Style};

/// Color palette for one theme
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
    pub error: Color,
    pub muted: Color,
    pub highlight: Color,
    pub bar: Color,
}

pub const STANDARD: Theme = Theme {
    primary: Color::Rgb(64, 128, 192),
    secondary: Color::Rgb(96, 160, 96),
    accent: Color::Rgb(192, 160, 64),
    error: Color::Rgb(192, 64, 64),
    muted: Color::Rgb(128, 128, 128),
    highlight: Color::Rgb(48, 48, 64),
    bar: Color::Rgb(32, 32, 40),
};

/// Dark gold palette unlocked by "Activate Premium"
pub const PREMIUM: Theme = Theme {
    primary: Color::Rgb(218, 165, 32),
    secondary: Color::Rgb(150, 200, 120),
    accent: Color::Rgb(230, 200, 120),
    error: Color::Rgb(220, 80, 80),
    muted: Color::Rgb(140, 130, 110),
    highlight: Color::Rgb(60, 48, 24),
    bar: Color::Rgb(20, 16, 8),
};

pub fn theme(premium: bool) -> &'static Theme {
    if premium {
        &PREMIUM
    } else {
        &STANDARD
    }
}

impl Theme {
    pub fn title(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn list_item(&self) -> Style {
        Style::default().fg(Color::White)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn highlight(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error)
    }

    pub fn tab(&self, selected: bool) -> Style {
        if selected {
            Style::default()
                .fg(self.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            self.muted()
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.primary)
        } else {
            Style::default().fg(self.muted)
        }
    }

    pub fn status_bar(&self) -> Style {
        Style::default().bg(self.bar).fg(Color::White)
    }

    pub fn help_key(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn help_desc(&self) -> Style {
        Style::default().fg(Color::White)
    }
}
