// Scrollable text-output panel.
// - Renders the title with a line counter and the visible slice of lines.
// - Callers pass a scroll offset already clamped to the viewport.
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::pane_border_style;

pub struct LogPanelStateView<'a> {
    pub title: &'a str,
    pub lines: &'a [String],
    pub scroll: usize,
    pub focused: bool,
    pub accent_color: Color,
    pub trim_wrapped_lines: bool,
}

pub fn render_log_panel(frame: &mut Frame, area: Rect, panel: LogPanelStateView<'_>) {
    let lines = panel
        .lines
        .iter()
        .map(String::as_str)
        .map(Line::from)
        .collect::<Vec<_>>();

    let counter = if panel.lines.is_empty() {
        String::new()
    } else {
        format!(
            "{}/{}",
            (panel.scroll + 1).min(panel.lines.len()),
            panel.lines.len()
        )
    };

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border_style(panel.focused, panel.accent_color))
                .title_top(Line::from(panel.title).left_aligned())
                .title_top(
                    Line::styled(counter, Style::default().fg(Color::DarkGray)).right_aligned(),
                ),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap {
            trim: panel.trim_wrapped_lines,
        })
        .scroll((panel.scroll.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(widget, area);
}
