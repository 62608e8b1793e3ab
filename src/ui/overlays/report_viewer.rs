//! Diagnostic report overlay

use crate::app::App;
use crate::theme;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame,
};

/// Render the diagnostic report overlay
pub fn render(frame: &mut Frame, app: &App) {
    let area = centered_rect(85, 85, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_FOCUSED))
        .title(crate::constants::TITLE_REPORT)
        .title_bottom(Line::from(" [Esc] Close  [↑/↓] Scroll ").centered());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = app.report_text().lines().map(highlight_report_line).collect();
    let total_lines = lines.len();

    let [status_area, content_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1)]).areas(inner);

    let status = match &app.network {
        Some(info) if info.success => Span::styled("Diagnostic complete", Style::default().fg(theme::SUCCESS)),
        Some(_) => Span::styled("Diagnostic incomplete", Style::default().fg(theme::ERROR)),
        None => Span::styled(crate::constants::MSG_LOADING, Style::default().fg(theme::TEXT_SECONDARY)),
    };
    let scroll_info = format!(" (line {}/{})", app.report_scroll + 1, total_lines.max(1));
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            status,
            Span::styled(scroll_info, Style::default().fg(Color::DarkGray)),
        ])),
        status_area,
    );

    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(theme::TEXT_PRIMARY))
            .scroll((app.report_scroll, 0)),
        content_area,
    );

    let scrollbar = Scrollbar::default()
        .orientation(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"))
        .style(Style::default().fg(theme::TEXT_SECONDARY))
        .thumb_style(Style::default().fg(theme::ACCENT_PRIMARY));

    let mut scrollbar_state =
        ScrollbarState::new(total_lines.saturating_sub(content_area.height as usize))
            .position(app.report_scroll as usize);

    let scroll_area = Rect {
        x: area.right().saturating_sub(1),
        y: content_area.y,
        width: 1,
        height: content_area.height,
    };
    frame.render_stateful_widget(scrollbar, scroll_area, &mut scrollbar_state);
}

/// Ping summaries are colored by outcome, `Label: value` lines split in two.
fn highlight_report_line(line: &str) -> Line<'static> {
    if line.starts_with("Ping ") {
        let color = if line.ends_with("unreachable") {
            theme::ERROR
        } else {
            theme::SUCCESS
        };
        return Line::from(Span::styled(
            line.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some((label, value)) = line.split_once(": ") {
        return Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(theme::REPORT_LABEL)),
            Span::styled(value.to_string(), Style::default().fg(theme::TEXT_PRIMARY)),
        ]);
    }

    Line::from(Span::styled(line.to_string(), Style::default().fg(theme::TEXT_PRIMARY)))
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);

    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_lines_colored_by_outcome() {
        let ok = highlight_report_line("Ping 10.0.0.1: reachable (2.0 ms)");
        assert_eq!(ok.spans[0].style.fg, Some(theme::SUCCESS));
        let bad = highlight_report_line("Ping 10.0.0.1: unreachable");
        assert_eq!(bad.spans[0].style.fg, Some(theme::ERROR));
    }

    #[test]
    fn test_detail_line_split() {
        let line = highlight_report_line("IP6.GATEWAY: fe80::1");
        assert_eq!(line.spans.len(), 2);
        assert_eq!(line.spans[0].content, "IP6.GATEWAY: ");
        assert_eq!(line.spans[0].style.fg, Some(theme::REPORT_LABEL));
        assert_eq!(line.spans[1].content, "fe80::1");
    }
}
