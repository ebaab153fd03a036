use colored::Color;

/// Colour scheme preference, stored as `"light"` or `"dark"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette {
                user: Color::Blue,
                assistant: Color::Black,
                error: Color::Red,
                notice: Color::BrightBlack,
                accent: Color::Magenta,
            },
            Theme::Dark => Palette {
                user: Color::BrightCyan,
                assistant: Color::White,
                error: Color::BrightRed,
                notice: Color::BrightBlack,
                accent: Color::BrightMagenta,
            },
        }
    }
}

/// Terminal colours used for each kind of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub user: Color,
    pub assistant: Color,
    pub error: Color,
    pub notice: Color,
    pub accent: Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_stored_values_only() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse(" Light "), Some(Theme::Light));
        assert_eq!(Theme::parse("solarized"), None);
    }

    #[test]
    fn toggle_flips_between_the_two_themes() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn palettes_differ_per_theme() {
        assert_ne!(Theme::Light.palette(), Theme::Dark.palette());
    }
}
