//! Footer widget with context-aware keybinding hints

use crate::app::App;
use crate::theme;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Key hints for the current view.
#[must_use]
pub fn hints(app: &App) -> Vec<(&'static str, &'static str)> {
    if app.show_report {
        return vec![("↑↓", "Scroll"), ("g", "Top"), ("G", "End"), ("Esc", "Close")];
    }

    let mut hints = Vec::new();
    if !app.connections.is_empty() {
        hints.extend_from_slice(&[("↑↓", "Select"), ("Enter", "Toggle")]);
    }
    if app.ipv6_toggle_enabled() {
        hints.push(("6", "IPv6"));
    }
    if app.openvpn_toggle_enabled() {
        hints.push(("o", "OpenVPN"));
    }
    hints.extend_from_slice(&[("r", "Refresh"), ("i", "Report"), ("q", "Quit")]);
    hints
}

/// Render dashboard footer with context-aware shortcuts
pub fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    render_hints(frame, area, &hints(app));
}

fn render_hints(frame: &mut Frame, area: Rect, hints: &[(&str, &str)]) {
    let [left, right] = Layout::horizontal([Constraint::Min(0), Constraint::Length(20)]).areas(area);

    let mut hint_spans = vec![Span::raw(" ")];
    let mut current_width = 1;
    let max_width = left.width as usize;

    for (i, (key, action)) in hints.iter().enumerate() {
        // " │ " between items
        let sep_width = if i > 0 { 3 } else { 0 };
        let item_width = key.chars().count() + 1 + action.len() + sep_width;

        if current_width + item_width > max_width {
            break;
        }

        if i > 0 {
            hint_spans.push(Span::styled(" │ ", Style::default().fg(Color::Rgb(50, 50, 50))));
        }
        hint_spans.push(Span::styled(
            *key,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        hint_spans.push(Span::raw(" "));
        hint_spans.push(Span::styled(*action, Style::default().fg(Color::DarkGray)));

        current_width += item_width;
    }
    frame.render_widget(Paragraph::new(Line::from(hint_spans)), left);

    let branding = Line::from(Span::styled(
        format!(
            "{} v{} ",
            crate::constants::APP_NAME,
            crate::constants::APP_VERSION
        ),
        Style::default().fg(theme::TEXT_SECONDARY),
    ));
    frame.render_widget(Paragraph::new(branding).alignment(Alignment::Right), right);
}
