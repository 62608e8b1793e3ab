//! UI rendering module

mod dashboard;
mod overlays;
mod widgets;

use crate::app::App;
use ratatui::Frame;

/// Main render function - dispatches to appropriate view
pub fn render(frame: &mut Frame, app: &mut App) {
    // Base view
    dashboard::render(frame, app);

    if app.show_report {
        overlays::report_viewer::render(frame, app);
    }

    // Toasts stay on top of everything
    if app.toast.is_some() {
        overlays::toast::render(frame, app);
    }
}
