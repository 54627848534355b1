// Renames-tab rendering: the live edit plus both history stacks.
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{
    app::App,
    model::Focus,
    rename::{EditMode, Edition},
};

use super::super::pane_border_style;

pub fn render_renames_tab(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    let renames = &app.renames;
    let mut lines = vec![
        section("CURRENT"),
        Line::from(vec![
            Span::styled("Mode      ", label_style()),
            Span::raw(mode_label(renames.mode())),
        ]),
    ];
    if renames.has_open_edit() {
        lines.push(Line::from(vec![
            Span::styled("Editing   ", label_style()),
            Span::raw(renames.current().name.clone()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(section("UNDO (u)"));
    push_history(&mut lines, renames.undo_entries());
    lines.push(Line::from(""));
    lines.push(section("REDO (U)"));
    push_history(&mut lines, renames.redo_entries());

    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border_style(focus != Focus::Left, Color::LightYellow))
                .title("Rename history"),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });

    frame.render_widget(widget, area);
}

fn push_history<'a>(lines: &mut Vec<Line<'static>>, entries: impl Iterator<Item = &'a Edition>) {
    let before = lines.len();
    for edition in entries {
        let new_value = edition.new_value.as_deref().unwrap_or("(editing)");
        lines.push(Line::from(vec![
            Span::raw(format!("  {}", edition.old_value)),
            Span::styled(" -> ", Style::default().fg(Color::DarkGray)),
            Span::styled(new_value.to_string(), Style::default().fg(Color::LightGreen)),
        ]));
    }
    if lines.len() == before {
        lines.push(Line::styled("  (empty)", Style::default().fg(Color::DarkGray)));
    }
}

fn mode_label(mode: EditMode) -> &'static str {
    match mode {
        EditMode::Edit => "edit",
        EditMode::Undo => "undo",
        EditMode::Redo => "redo",
    }
}

fn section(title: &str) -> Line<'static> {
    Line::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn label_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}
