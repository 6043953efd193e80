use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::theme;

pub const BINDINGS: [(&str, &str); 15] = [
    ("1-2 / Tab", "Switch tabs"),
    ("j/k or Up/Down", "Navigate list / scroll"),
    ("h/l or Left/Right", "Switch panes (Requests)"),
    ("g / G", "Jump to top / bottom"),
    ("o / Enter", "Open PR in browser (marks it viewed)"),
    ("c", "Check out PR branch (Requests)"),
    ("r", "Refresh review requests"),
    ("s", "Sync review history"),
    ("R", "Clear history and resync"),
    ("x", "Remove all viewed markers"),
    ("d", "Forget tracked events for selected PR"),
    ("a", "Re-authenticate with gh"),
    ("?", "Toggle this help"),
    ("Esc", "Close help"),
    ("q / Ctrl+C", "Quit"),
];

pub fn draw_help(f: &mut Frame, area: Rect) {
    // Center a box
    let width = 60u16.min(area.width.saturating_sub(4));
    let height = (BINDINGS.len() as u16 + 4).min(area.height.saturating_sub(2));

    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(area.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vert[1]);

    let popup_area = horiz[1];

    // Clear background
    f.render_widget(Clear, popup_area);

    let mut lines = vec![
        Line::from(Span::styled("Keybindings", theme::HELP_TITLE)),
        Line::from(""),
    ];
    for (key, desc) in BINDINGS {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<20}", key), theme::HELP_KEY),
            Span::styled(desc, theme::HELP_DESC),
        ]));
    }

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(theme::BORDER_ACTIVE);

    let paragraph = Paragraph::new(lines).block(block);
    f.render_widget(paragraph, popup_area);
}
