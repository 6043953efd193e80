use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::{activity_view, help_overlay, requests_view, tabs, theme};
use crate::app::{ActiveTab, App, RequestsPane};

pub fn draw_layout(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tab bar
            Constraint::Min(3),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    tabs::draw_tab_bar(f, chunks[0], app);
    draw_content(f, chunks[1], app);
    draw_status_bar(f, chunks[2], app);

    // Help overlay (on top of everything)
    if app.show_help {
        help_overlay::draw_help(f, f.area());
    }
}

fn draw_content(f: &mut Frame, area: Rect, app: &App) {
    match app.active_tab {
        ActiveTab::Requests => requests_view::draw_requests(f, area, app),
        ActiveTab::Activity => activity_view::draw_activity(f, area, app),
    }
}

fn hint_text(app: &App) -> Vec<(&'static str, &'static str)> {
    let mut hints: Vec<(&str, &str)> = match app.active_tab {
        ActiveTab::Requests => match app.requests_pane {
            RequestsPane::List => vec![
                ("j/k", "nav"),
                ("o", "open"),
                ("c", "checkout"),
                ("r", "refresh"),
            ],
            RequestsPane::Detail => vec![("j/k", "scroll"), ("h", "list"), ("o", "open")],
        },
        ActiveTab::Activity => vec![
            ("j/k", "nav"),
            ("s", "sync"),
            ("R", "resync"),
            ("x", "clear views"),
            ("d", "forget"),
        ],
    };
    hints.push(("?", "help"));
    hints
}

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut left_spans: Vec<Span> = Vec::new();

    if app.syncing {
        left_spans.push(Span::styled(" SYNC ", theme::STATUS_BUSY));
    }

    // Error display wins over informational messages
    if let Some(ref err) = app.last_error {
        left_spans.push(Span::styled(format!(" ERR: {} ", err), theme::STATUS_ERROR));
    } else if let Some(ref msg) = app.status_message {
        left_spans.push(Span::styled(format!(" {} ", msg), theme::STATUS_INFO));
    }

    // Build right-aligned hint spans
    let hints = hint_text(app);
    let mut hint_spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            hint_spans.push(Span::styled("  ", theme::STATUS_BAR));
        }
        hint_spans.push(Span::styled(*key, theme::HINT_KEY));
        hint_spans.push(Span::styled(":", theme::HINT_DESC));
        hint_spans.push(Span::styled(*desc, theme::HINT_DESC));
    }
    hint_spans.push(Span::styled(" ", theme::STATUS_BAR));

    let left_width: usize = left_spans.iter().map(|s| s.width()).sum();
    let hint_width: usize = hint_spans.iter().map(|s| s.width()).sum();
    let total = area.width as usize;
    let gap = total.saturating_sub(left_width + hint_width);

    let mut spans = left_spans;
    spans.push(Span::styled(" ".repeat(gap), theme::STATUS_BAR));
    spans.extend(hint_spans);

    let line = Line::from(spans);
    f.render_widget(Paragraph::new(line), area);
}
