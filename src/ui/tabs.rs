use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use super::theme;
use crate::app::{ActiveTab, App};

pub fn draw_tab_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = Vec::new();
    for (i, tab) in ActiveTab::ALL.iter().enumerate() {
        let num = i + 1;
        let label = match tab {
            ActiveTab::Requests => {
                if app.new_requests > 0 {
                    format!("{}:Requests +{}", num, app.new_requests)
                } else {
                    format!("{}:Requests", num)
                }
            }
            ActiveTab::Activity => format!("{}:Activity", num),
        };

        let style = if *tab == app.active_tab {
            theme::TAB_ACTIVE
        } else if *tab == ActiveTab::Requests && app.new_requests > 0 {
            theme::PR_BADGE
        } else {
            theme::TAB_INACTIVE
        };
        spans.push(Span::styled(format!(" {} ", label), style));
        spans.push(Span::raw(" "));
    }

    // Version on the right
    let version = format!("revq v{}", env!("CARGO_PKG_VERSION"));
    let tabs_width: usize = spans.iter().map(|s| s.width()).sum();
    let total_used = tabs_width + version.len();
    let pad = (area.width as usize).saturating_sub(total_used);
    if pad > 0 {
        spans.push(Span::raw(" ".repeat(pad)));
    }
    spans.push(Span::styled(version, theme::STATUS_BAR));

    let line = Line::from(spans);
    f.render_widget(Paragraph::new(line), area);
}
