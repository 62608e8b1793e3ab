//! Main panel view: connections on the left, network info and settings on
//! the right.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use super::widgets::footer;
use crate::app::App;
use crate::constants;
use crate::theme;

pub fn render(frame: &mut Frame, app: &mut App) {
    let [header, body, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, app, header);

    let [left, right] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(body);
    let [info, settings] =
        Layout::vertical([Constraint::Length(7), Constraint::Min(0)]).areas(right);

    render_connections(frame, app, left);
    render_network_info(frame, app, info);
    render_settings(frame, app, settings);

    footer::render_dashboard(frame, app, footer_area);
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::BORDER_DEFAULT))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme::ACCENT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        format!(" {} ", constants::APP_NAME),
        Style::default()
            .fg(theme::ACCENT_PRIMARY)
            .add_modifier(Modifier::BOLD),
    )];

    let status = if let Some(busy) = &app.busy {
        Span::styled(busy.clone(), Style::default().fg(theme::WARNING))
    } else if app.loading {
        Span::styled(constants::MSG_LOADING, Style::default().fg(theme::TEXT_SECONDARY))
    } else if let Some(active) = &app.active {
        Span::styled(
            format!("{} ({})", active.connection.name(), active.connection.device()),
            Style::default().fg(theme::TEXT_PRIMARY),
        )
    } else {
        Span::styled(constants::MSG_NO_ACTIVE, Style::default().fg(theme::TEXT_SECONDARY))
    };
    spans.push(status);

    if !app.is_root {
        spans.push(Span::styled("  [not root]", Style::default().fg(theme::WARNING)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_connections(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = panel_block(constants::TITLE_CONNECTIONS);

    if app.connections.is_empty() {
        let (message, color) = match (&app.connections_error, app.loading) {
            (Some(e), _) => (e.clone(), theme::ERROR),
            (None, true) => (constants::MSG_LOADING.to_string(), theme::TEXT_SECONDARY),
            (None, false) => (constants::MSG_NO_CONNECTIONS.to_string(), theme::TEXT_SECONDARY),
        };
        frame.render_widget(
            Paragraph::new(message)
                .style(Style::default().fg(color))
                .wrap(Wrap { trim: true })
                .block(block),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .connections
        .iter()
        .map(|connection| {
            let (marker, color) = if connection.connected() {
                ("●", theme::SUCCESS)
            } else {
                ("○", theme::INACTIVE)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!(" {marker} "), Style::default().fg(color)),
                Span::styled(connection.name().to_string(), Style::default().fg(theme::TEXT_PRIMARY)),
                Span::styled(
                    format!("  {}", connection.type_name()),
                    Style::default().fg(theme::TEXT_SECONDARY),
                ),
            ]))
        })
        .collect();

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(theme::ROW_SELECTED_BG)
            .fg(theme::ROW_SELECTED_FG)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn yes_no(value: bool) -> Span<'static> {
    Span::styled(
        if value { "Yes" } else { "No" },
        Style::default().fg(theme::status(value)),
    )
}

fn field<'a>(label: &'a str, value: Span<'a>) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!(" {label}: "), Style::default().fg(theme::TEXT_SECONDARY)),
        value,
    ])
}

fn render_network_info(frame: &mut Frame, app: &App, area: Rect) {
    let value = |text: &str| Span::styled(text.to_string(), Style::default().fg(theme::TEXT_PRIMARY));
    let gateway = app.network.as_ref().is_some_and(|n| n.gateway_reachable);

    let lines = vec![
        field(constants::LABEL_PRIORITY_INTERFACE, value(&app.interface.data)),
        field(constants::LABEL_PRIORITY_LAN_IP, value(&app.lan_ip.data)),
        field(constants::LABEL_GATEWAY, yes_no(gateway)),
        field(constants::LABEL_INTERNET, yes_no(app.internet)),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(constants::TITLE_NETWORK_INFO)),
        area,
    );
}

fn setting_lines<'a>(key: &'a str, label: &'a str, description: &'a str, checked: bool, enabled: bool) -> [Line<'a>; 2] {
    let color = if enabled { theme::TEXT_PRIMARY } else { theme::INACTIVE };
    let checkbox = if checked { "[x]" } else { "[ ]" };
    [
        Line::from(vec![
            Span::styled(
                format!(" {key} "),
                Style::default()
                    .fg(theme::ACCENT_SECONDARY)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{checkbox} {label}"), Style::default().fg(color)),
        ]),
        Line::from(Span::styled(
            format!("     {description}"),
            Style::default().fg(theme::TEXT_SECONDARY),
        )),
    ]
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let ipv6_disabled = app.active.as_ref().is_some_and(|a| a.ipv6_disabled);

    let mut lines = Vec::new();
    lines.extend(setting_lines(
        "o",
        constants::LABEL_ENABLE_OPENVPN,
        constants::DESC_ENABLE_OPENVPN,
        app.vpn_enabled || app.openvpn_installed,
        app.openvpn_toggle_enabled(),
    ));
    lines.push(Line::default());
    lines.extend(setting_lines(
        "6",
        constants::LABEL_DISABLE_IPV6,
        constants::DESC_DISABLE_IPV6,
        ipv6_disabled,
        app.ipv6_toggle_enabled(),
    ));

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(panel_block(constants::TITLE_SETTINGS)),
        area,
    );
}
