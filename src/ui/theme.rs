use ratatui::style::{Color, Modifier, Style};

// Tab bar
pub const TAB_ACTIVE: Style = Style::new().fg(Color::Black).bg(Color::Cyan);
pub const TAB_INACTIVE: Style = Style::new().fg(Color::Gray).bg(Color::DarkGray);

// Status bar
pub const STATUS_BAR: Style = Style::new().fg(Color::White).bg(Color::DarkGray);
pub const STATUS_ERROR: Style = Style::new().fg(Color::Red).bg(Color::DarkGray);
pub const STATUS_INFO: Style = Style::new().fg(Color::Green).bg(Color::DarkGray);
pub const STATUS_BUSY: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

// List items
pub const LIST_SELECTED: Style = Style::new()
    .fg(Color::White)
    .bg(Color::DarkGray)
    .add_modifier(Modifier::BOLD);
pub const LIST_NORMAL: Style = Style::new().fg(Color::White);
pub const LIST_DIM: Style = Style::new().fg(Color::DarkGray);

// Borders
pub const BORDER_ACTIVE: Style = Style::new().fg(Color::Cyan);
pub const BORDER_INACTIVE: Style = Style::new().fg(Color::DarkGray);

// Help overlay
pub const HELP_TITLE: Style = Style::new().fg(Color::Cyan).add_modifier(Modifier::BOLD);
pub const HELP_KEY: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);
pub const HELP_DESC: Style = Style::new().fg(Color::White);

// Footer hints
pub const HINT_KEY: Style = Style::new().fg(Color::Yellow).bg(Color::DarkGray);
pub const HINT_DESC: Style = Style::new().fg(Color::Gray).bg(Color::DarkGray);

// Empty state
pub const EMPTY_STATE: Style = Style::new().fg(Color::DarkGray);

// Diff stats
pub const DIFF_ADD: Style = Style::new().fg(Color::Green);
pub const DIFF_REMOVE: Style = Style::new().fg(Color::Red);

// Review requests
pub const PR_REPO: Style = Style::new().fg(Color::Cyan);
pub const PR_SIZE: Style = Style::new().fg(Color::Magenta);
pub const PR_LABEL: Style = Style::new().fg(Color::Yellow);
pub const PR_BADGE: Style = Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD);

// Review outcomes
pub const OUTCOME_APPROVED: Style = Style::new().fg(Color::Green);
pub const OUTCOME_CHANGES: Style = Style::new().fg(Color::Red);
pub const OUTCOME_COMMENTED: Style = Style::new().fg(Color::Cyan);
pub const OUTCOME_VIEWED: Style = Style::new().fg(Color::DarkGray);

// Heatmap shades, indexed by intensity 0..=4
pub const HEAT: [Style; 5] = [
    Style::new().fg(Color::DarkGray),
    Style::new().fg(Color::Rgb(14, 68, 41)),
    Style::new().fg(Color::Rgb(0, 109, 50)),
    Style::new().fg(Color::Rgb(38, 166, 65)),
    Style::new().fg(Color::Rgb(57, 211, 83)),
];
pub const HEAT_LABEL: Style = Style::new().fg(Color::Gray);
pub const SUMMARY_VALUE: Style = Style::new().fg(Color::White).add_modifier(Modifier::BOLD);

/// Label chip colored with the label's GitHub hex color ("d73a4a").
/// Falls back to `PR_LABEL` when the color is missing or malformed.
pub fn label_style(hex: &str) -> Style {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return PR_LABEL;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Style::new().fg(Color::Rgb(r, g, b)),
        _ => PR_LABEL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_style_parses_hex() {
        assert_eq!(label_style("d73a4a"), Style::new().fg(Color::Rgb(0xd7, 0x3a, 0x4a)));
        assert_eq!(label_style("#00ff00"), Style::new().fg(Color::Rgb(0, 255, 0)));
        assert_eq!(label_style(""), PR_LABEL);
        assert_eq!(label_style("zzzzzz"), PR_LABEL);
    }
}
