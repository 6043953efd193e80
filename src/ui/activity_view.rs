use chrono::Datelike;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use super::theme;
use super::util::truncate_width;
use crate::app::App;
use crate::model::review::{heatmap_weeks, intensity, DayCount, ReviewOutcome};

const WEEKDAY_LABELS: [&str; 7] = ["Mon ", "    ", "Wed ", "    ", "Fri ", "    ", "    "];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub fn draw_activity(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Heatmap: month row + 7 days + borders
            Constraint::Length(3),  // Summary
            Constraint::Min(3),     // Recent reviews
        ])
        .split(area);

    draw_heatmap(f, chunks[0], app);
    draw_summary(f, chunks[1], app);
    draw_recent(f, chunks[2], app);
}

/// Heatmap rows as styled lines: a month header, then Monday through Sunday.
/// Only the most recent weeks that fit in `width` columns are shown.
pub fn heatmap_lines(days: &[DayCount], width: usize) -> Vec<Line<'static>> {
    let weeks = heatmap_weeks(days);
    let label_width = WEEKDAY_LABELS[0].len();
    let fit = width.saturating_sub(label_width) / 2;
    let weeks = &weeks[weeks.len().saturating_sub(fit)..];

    // Month names go above the first week that contains the 1st of the month,
    // as long as they don't collide with the previous name.
    let mut header = vec![' '; label_width + weeks.len() * 2];
    let mut next_free = 0;
    for (col, week) in weeks.iter().enumerate() {
        let first_of_month = week.iter().flatten().find(|d| d.date.day() == 1);
        if let Some(d) = first_of_month {
            let pos = label_width + col * 2;
            let name = MONTHS[d.date.month0() as usize];
            if pos >= next_free && pos + name.len() <= header.len() {
                for (i, ch) in name.chars().enumerate() {
                    header[pos + i] = ch;
                }
                next_free = pos + name.len() + 1;
            }
        }
    }

    let mut lines = vec![Line::from(Span::styled(
        header.into_iter().collect::<String>(),
        theme::HEAT_LABEL,
    ))];

    for (row, label) in WEEKDAY_LABELS.iter().enumerate() {
        let mut spans = vec![Span::styled(*label, theme::HEAT_LABEL)];
        for week in weeks {
            match week[row] {
                Some(day) => {
                    let shade = theme::HEAT[intensity(day.count) as usize];
                    spans.push(Span::styled("■ ", shade));
                }
                None => spans.push(Span::raw("  ")),
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn draw_heatmap(f: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " Review Activity (last {} days) ",
        app.config.heatmap_days()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::BORDER_INACTIVE);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = heatmap_lines(&app.activity_days, inner.width as usize);
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_summary(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.activity_summary;
    let busiest = match s.busiest {
        Some(d) => format!("{} ({})", d.date.format("%b %-d"), d.count),
        None => "-".to_string(),
    };
    let last_sync = app.last_sync.as_deref().unwrap_or("never");

    let pair = |label: &'static str, value: String| {
        vec![
            Span::styled(label, theme::HEAT_LABEL),
            Span::styled(value, theme::SUMMARY_VALUE),
            Span::raw("   "),
        ]
    };

    let mut spans = Vec::new();
    spans.extend(pair("Reviews: ", s.total.to_string()));
    spans.extend(pair("Active days: ", s.active_days.to_string()));
    spans.extend(pair("Streak: ", s.current_streak.to_string()));
    spans.extend(pair("Longest: ", s.longest_streak.to_string()));
    spans.extend(pair("Busiest: ", busiest));
    spans.extend(pair("Last sync: ", last_sync.to_string()));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::BORDER_INACTIVE);
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn outcome_style(outcome: ReviewOutcome) -> ratatui::style::Style {
    match outcome {
        ReviewOutcome::Approved => theme::OUTCOME_APPROVED,
        ReviewOutcome::ChangesRequested => theme::OUTCOME_CHANGES,
        ReviewOutcome::Commented => theme::OUTCOME_COMMENTED,
        ReviewOutcome::ViewedLocally => theme::OUTCOME_VIEWED,
    }
}

fn draw_recent(f: &mut Frame, area: Rect, app: &App) {
    let title = if app.syncing {
        format!(" Recent Reviews [{}] (syncing) ", app.recent.len())
    } else {
        format!(" Recent Reviews [{}] ", app.recent.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme::BORDER_ACTIVE);

    if app.recent.is_empty() {
        let p = Paragraph::new("No review history yet. Press s to sync from GitHub.")
            .style(theme::EMPTY_STATE)
            .block(block);
        f.render_widget(p, area);
        return;
    }

    // Borders, "[x] ", the 16-char timestamp and spacing.
    let text_width = (area.width as usize).saturating_sub(2 + 4 + 17);

    let items: Vec<ListItem> = app
        .recent
        .iter()
        .map(|e| {
            let when = e.reviewed_at.get(..16).unwrap_or(e.reviewed_at.as_str()).replace('T', " ");
            let text = format!("{}#{} {}", e.repository, e.pr_number, e.pr_title);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", e.state.icon()), outcome_style(e.state)),
                Span::styled(format!("{} ", when), theme::LIST_DIM),
                Span::styled(truncate_width(&text, text_width).into_owned(), theme::LIST_NORMAL),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.recent_index));

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::LIST_SELECTED);
    f.render_stateful_widget(list, area, &mut state);
}
