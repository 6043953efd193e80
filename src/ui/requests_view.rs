use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use super::theme;
use super::util::truncate_width;
use crate::app::{App, RequestsPane};

pub fn draw_requests(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    draw_request_list(f, chunks[0], app);
    draw_request_detail(f, chunks[1], app);
}

fn draw_request_list(f: &mut Frame, area: Rect, app: &App) {
    let is_active = app.requests_pane == RequestsPane::List;
    let border_style = if is_active {
        theme::BORDER_ACTIVE
    } else {
        theme::BORDER_INACTIVE
    };

    let title = if app.requests_loading {
        format!(" Review Requests [{}] (loading) ", app.requests.len())
    } else {
        format!(" Review Requests [{}] ", app.requests.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.requests.is_empty() {
        let msg = if app.requests_loading {
            "Loading..."
        } else {
            "Nothing waiting for your review"
        };
        let p = Paragraph::new(msg).style(theme::EMPTY_STATE).block(block);
        f.render_widget(p, area);
        return;
    }

    // Borders plus the "[XL] #12345 " prefix.
    let title_width = (area.width as usize).saturating_sub(2 + 13);

    let items: Vec<ListItem> = app
        .requests
        .iter()
        .map(|pr| {
            let lines = vec![
                Line::from(vec![
                    Span::styled(format!("[{:>2}] ", pr.size_label()), theme::PR_SIZE),
                    Span::styled(format!("#{} ", pr.number), theme::LIST_NORMAL),
                    Span::styled(truncate_width(&pr.title, title_width), theme::LIST_NORMAL),
                ]),
                Line::from(vec![
                    Span::styled(format!("     {}", pr.repository.full_name), theme::PR_REPO),
                    Span::styled(format!("  by {}", pr.author.login), theme::LIST_DIM),
                ]),
            ];
            ListItem::new(lines)
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.request_index));

    let list = List::new(items)
        .block(block)
        .highlight_style(theme::LIST_SELECTED);

    f.render_stateful_widget(list, area, &mut state);
}

fn draw_request_detail(f: &mut Frame, area: Rect, app: &App) {
    let is_active = app.requests_pane == RequestsPane::Detail;
    let border_style = if is_active {
        theme::BORDER_ACTIVE
    } else {
        theme::BORDER_INACTIVE
    };

    let selected = app.selected_request();

    let title = match selected {
        Some(pr) => format!(" {} ", pr.reference()),
        None => " PR Detail ".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let Some(pr) = selected else {
        let p = Paragraph::new("Select a PR to view details")
            .style(theme::EMPTY_STATE)
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        pr.title.clone(),
        theme::LIST_NORMAL.add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(vec![
        Span::styled("Repository: ", theme::LIST_NORMAL),
        Span::styled(pr.repository.name.clone(), theme::PR_REPO),
        Span::styled(format!("  ({})", pr.repository.owner), theme::LIST_DIM),
    ]));
    lines.push(Line::from(vec![
        Span::styled(format!("Author: {}", pr.author.login), theme::LIST_NORMAL),
        Span::styled(format!("  {}", pr.author.avatar_url), theme::LIST_DIM),
    ]));
    lines.push(Line::from(Span::styled(
        format!("State: {}", pr.state),
        theme::LIST_NORMAL,
    )));

    lines.push(Line::from(vec![
        Span::styled(format!("Size: {} (", pr.size_label()), theme::LIST_NORMAL),
        Span::styled(format!("+{}", pr.additions), theme::DIFF_ADD),
        Span::styled(" ", theme::LIST_NORMAL),
        Span::styled(format!("-{}", pr.deletions), theme::DIFF_REMOVE),
        Span::styled(")", theme::LIST_NORMAL),
    ]));

    lines.push(Line::from(Span::styled(
        format!(
            "Comments: {}  Review comments: {}",
            pr.comments, pr.review_comments
        ),
        theme::LIST_NORMAL,
    )));

    if !pr.requested_reviewers.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("Reviewers: {}", pr.requested_reviewers.join(", ")),
            theme::LIST_NORMAL,
        )));
    }

    if !pr.labels.is_empty() {
        let mut spans = vec![Span::styled("Labels: ", theme::LIST_NORMAL)];
        for (i, label) in pr.labels.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(
                format!("[{}]", label.name),
                theme::label_style(&label.color),
            ));
        }
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(Span::styled(
        format!("Created: {}", pr.created_at),
        theme::LIST_NORMAL,
    )));
    lines.push(Line::from(Span::styled(
        format!("Updated: {}", pr.updated_at),
        theme::LIST_NORMAL,
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("URL: {}", pr.url),
        theme::LIST_NORMAL,
    )));

    // Apply scroll offset
    let inner = block.inner(area);
    f.render_widget(block, area);

    let inner_height = inner.height as usize;
    let total = lines.len();
    let scroll_offset = app.detail_scroll.min(total.saturating_sub(inner_height));
    let visible_end = (scroll_offset + inner_height).min(total);

    let visible_lines: Vec<Line> = lines[scroll_offset..visible_end].to_vec();
    let paragraph = Paragraph::new(visible_lines);
    f.render_widget(paragraph, inner);
}
