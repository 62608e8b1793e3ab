//! Panel colours.
//!
//! Widgets only use the semantic names; the raw Nord shades stay private so
//! the palette can change in one place.

use ratatui::style::Color;

const POLAR_NIGHT_3: Color = Color::Rgb(67, 76, 94);
const POLAR_NIGHT_4: Color = Color::Rgb(76, 86, 106);
const SNOW_STORM_1: Color = Color::Rgb(216, 222, 233);
const FROST_CYAN: Color = Color::Rgb(136, 192, 208);
const FROST_BLUE: Color = Color::Rgb(129, 161, 193);
const AURORA_RED: Color = Color::Rgb(191, 97, 106);
const AURORA_YELLOW: Color = Color::Rgb(235, 203, 139);
const AURORA_GREEN: Color = Color::Rgb(163, 190, 140);

// === Text ===

pub const TEXT_PRIMARY: Color = SNOW_STORM_1;
/// Labels, hints and placeholder values.
pub const TEXT_SECONDARY: Color = POLAR_NIGHT_4;
/// Titles and the selected connection.
pub const ACCENT_PRIMARY: Color = FROST_CYAN;
pub const ACCENT_SECONDARY: Color = FROST_BLUE;
/// Property labels in the diagnostic report.
pub const REPORT_LABEL: Color = FROST_CYAN;

// === Status ===

/// Connected, reachable, enabled.
pub const SUCCESS: Color = AURORA_GREEN;
/// A request is in flight.
pub const WARNING: Color = AURORA_YELLOW;
/// Disconnected, unreachable, failed.
pub const ERROR: Color = AURORA_RED;
/// Toggles that cannot be used right now.
pub const INACTIVE: Color = Color::Gray;

// === Blocks and rows ===

pub const BORDER_DEFAULT: Color = POLAR_NIGHT_3;
pub const BORDER_FOCUSED: Color = FROST_CYAN;
pub const ROW_SELECTED_BG: Color = Color::Rgb(40, 40, 40);
pub const ROW_SELECTED_FG: Color = FROST_CYAN;

/// Color for a yes/no status value.
#[must_use]
pub const fn status(ok: bool) -> Color {
    if ok {
        SUCCESS
    } else {
        ERROR
    }
}
