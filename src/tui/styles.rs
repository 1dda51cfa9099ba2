//! Clinical color palette and styles.
//!
//! Report screens mark matches and failed checks with the semantic colors.

use ratatui::style::{Color, Modifier, Style};

/// Clinical theme color palette.
pub struct ClinicalTheme;

impl ClinicalTheme {
    // === Primary Colors ===

    /// Deep teal - primary accent
    pub const PRIMARY: Color = Color::Rgb(13, 148, 136); // #0D9488

    /// Light teal for highlights and key hints
    pub const PRIMARY_LIGHT: Color = Color::Rgb(45, 212, 191); // #2DD4BF

    /// Dark teal for table headers
    pub const PRIMARY_DARK: Color = Color::Rgb(15, 118, 110); // #0F766E

    // === Secondary Colors ===

    /// Light slate for borders
    pub const SECONDARY_LIGHT: Color = Color::Rgb(148, 163, 184); // #94A3B8

    // === Semantic Colors ===

    /// Emerald - compatible pairs
    pub const SUCCESS: Color = Color::Rgb(16, 185, 129); // #10B981

    /// Amber - flags and skipped rows
    pub const WARNING: Color = Color::Rgb(251, 191, 36); // #FBBF24

    /// Rose - failed checks and errors
    pub const DANGER: Color = Color::Rgb(244, 63, 94); // #F43F5E

    /// Blue - notices
    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    // === Background Colors ===

    /// Near-black background
    pub const BG_DARK: Color = Color::Rgb(15, 23, 42); // #0F172A

    // === Text Colors ===

    /// Primary text (white)
    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC

    /// Secondary text (gray)
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8

    /// Muted text for placeholders
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    // === Preset Styles ===

    /// Style for screen titles
    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for panel titles
    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for normal text
    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    /// Style for secondary text
    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Style for muted text
    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    /// Style for compatible results
    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    /// Style for warnings
    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    /// Style for errors and failed checks
    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::DANGER)
    }

    /// Style for notices
    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Style for the highlighted table row
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for the active field or tab
    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for borders
    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::SECONDARY_LIGHT)
    }

    /// Style for the border of the active field
    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    /// Style for table headers
    #[must_use]
    pub fn header() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .bg(Self::PRIMARY_DARK)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for key hints
    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Style for key descriptions
    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Style for the input cursor
    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    /// Style for a donor's compatible-recipient count
    #[must_use]
    pub fn match_count(count: usize) -> Style {
        if count == 0 {
            Self::text_muted()
        } else {
            Self::success()
        }
    }

    /// Style for a priority score; urgent recipients sit above 300 points.
    #[must_use]
    pub fn priority(score: f64) -> Style {
        if score >= crate::domain::priority::URGENCY_POINTS {
            Self::danger()
        } else if score >= 50.0 {
            Self::warning()
        } else {
            Self::text()
        }
    }

    /// Style for a Yes/No flag where "Yes" needs attention.
    #[must_use]
    pub fn flag(value: bool) -> Style {
        if value {
            Self::warning()
        } else {
            Self::text_secondary()
        }
    }
}

/// Name shown in the home screen title
pub const APP_NAME: &str = "Kidney Match";
