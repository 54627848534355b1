// Root UI composition and shared visual components.
// - Builds the global layout (left playlist + right tab area + footer).
// - Renders shared chrome: tab bar, keybind popup, rename prompt, cancel modal.
// - Delegates tab-specific rendering to ui::tabs submodules.
mod output_panel;
mod tabs;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{
    app::App,
    media::{is_audio_file, is_video_file},
    model::{FileEntry, Focus, RightTab},
};

pub fn render(frame: &mut Frame, app: &App, focus: Focus) {
    let [content, footer] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(34), Constraint::Percentage(66)]).areas(content);
    let [tabs_area, right_content] =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(right);

    render_playlist_pane(frame, app, focus, left);
    render_right_tabs(frame, app, focus, tabs_area);

    match app.right_tab() {
        RightTab::Convert => tabs::convert::render_convert_tab(frame, app, focus, right_content),
        RightTab::Renames => tabs::renames::render_renames_tab(frame, app, focus, right_content),
    }

    render_footer(frame, app, footer);
    if app.show_keybinds {
        render_keybinds_popup(frame, app);
    }
    if app.has_rename_prompt() {
        render_rename_prompt(frame, app);
    } else if app.has_pending_cancel() {
        render_cancel_confirm_modal(frame);
    }
}

fn render_right_tabs(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    let selected = RightTab::ALL
        .iter()
        .position(|tab| *tab == app.right_tab())
        .unwrap_or(0);
    let labels = RightTab::ALL
        .iter()
        .map(|tab| Line::from(format!(" {} {} ", tab.number(), tab.label())))
        .collect::<Vec<_>>();

    let tabs = Tabs::new(labels)
        .select(selected)
        .divider(Span::styled("|", Style::default().fg(Color::DarkGray)))
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title_top(Line::from("Tabs").left_aligned())
                .title_top(
                    Line::styled("(ctrl+n)", Style::default().fg(Color::DarkGray)).right_aligned(),
                )
                .border_style(pane_border_style(focus != Focus::Left, Color::Cyan)),
        );

    frame.render_widget(tabs, area);
}

fn render_playlist_pane(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    // Account for borders and highlight symbol so selected rows stay aligned.
    let content_width = area.width.saturating_sub(4) as usize;
    let source = app.source.as_ref().map(|source| source.path.as_path());
    let file_items = app
        .entries
        .iter()
        .map(|entry| {
            let line = format_file_row(entry, content_width);
            let style = if source == Some(entry.path.as_path()) {
                Style::default()
                    .fg(Color::LightYellow)
                    .add_modifier(Modifier::BOLD)
            } else if is_video_file(&entry.path) || is_audio_file(&entry.path) {
                Style::default().fg(Color::LightGreen)
            } else {
                Style::default()
            };
            ListItem::new(Line::styled(line, style))
        })
        .collect::<Vec<_>>();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(pane_border_style(focus == Focus::Left, Color::LightBlue))
        .title_top(Line::from(format!("Playlist: {}", app.cwd.display())).left_aligned())
        .title_top(
            Line::styled(
                format!("[{}] (s)", app.sort_order.label()),
                Style::default().fg(Color::DarkGray),
            )
            .right_aligned(),
        );
    let inner = block.inner(area);
    let visible_rows = inner.height as usize;
    app.set_file_browser_visible_rows(visible_rows);

    let mut list_state = ListState::default();
    if !app.entries.is_empty() {
        let selected = app.selected.min(app.entries.len().saturating_sub(1));
        let centered_offset = if visible_rows == 0 {
            0
        } else {
            let max_offset = app.entries.len().saturating_sub(visible_rows);
            selected.saturating_sub(visible_rows / 2).min(max_offset)
        };
        list_state = list_state
            .with_offset(centered_offset)
            .with_selected(Some(selected));
    }

    let files = List::new(file_items)
        .block(block)
        .highlight_symbol("> ")
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(files, area, &mut list_state);
}

fn centered_popup(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let [vertical] = Layout::vertical([Constraint::Percentage(height_percent)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(width_percent)])
        .flex(Flex::Center)
        .areas(vertical);
    popup
}

fn render_keybinds_popup(frame: &mut Frame, app: &App) {
    let popup = centered_popup(frame.area(), 70, 70);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::from("Press ? or Esc to close this window and focus the playlist."),
        Line::from(""),
        keybind_section("GLOBAL"),
        keybind_row("?", "toggle keybinds popup"),
        keybind_row("Esc", "close popup + focus playlist"),
        keybind_row("Ctrl+c / q", "quit app"),
        keybind_row("Up/Down or j/k", "scroll keybinds"),
        keybind_row("PgUp/PgDn or Ctrl+u/d", "page keybinds"),
        Line::from(""),
        keybind_section("WINDOW FOCUS"),
        keybind_row("Ctrl+h / Ctrl+Left", "focus playlist"),
        keybind_row("Ctrl+l / Ctrl+Right", "focus right column"),
        keybind_row("Ctrl+o", "focus conversion output"),
        keybind_row("Ctrl+j/k or Ctrl+Up/Down", "move window focus"),
        keybind_row("Ctrl+n or 1/2", "switch right tab"),
        Line::from(""),
        keybind_section("PLAYLIST"),
        keybind_row("j/k or Up/Down", "move selection"),
        keybind_row("PgUp/PgDn or Ctrl+u/d", "page selection"),
        keybind_row("Enter / l", "open dir or select conversion source"),
        keybind_row("h/-", "parent directory"),
        keybind_row("_", "initial directory"),
        keybind_row("s", "cycle sort order"),
        keybind_row("r", "refresh listing"),
        keybind_row("e / F2", "rename selected file"),
        keybind_row("u / U", "undo / redo last rename"),
        Line::from(""),
        keybind_section("RENAME PROMPT"),
        keybind_row("Enter", "apply new name"),
        keybind_row("Esc", "discard edit"),
        keybind_row("Left/Right, Backspace", "edit name"),
        Line::from(""),
        keybind_section("CONVERT FORM"),
        keybind_row("Tab / Shift+Tab", "move through fields"),
        keybind_row("Left/Right", "change choice / move cursor"),
        keybind_row("Space", "toggle normalize"),
        keybind_row("Backspace", "delete volume/output char"),
        keybind_row("Enter", "start conversion"),
        Line::from(""),
        keybind_section("CONVERSION OUTPUT"),
        keybind_row("j/k or Up/Down", "scroll output"),
        keybind_row("Ctrl+u / Ctrl+d", "page up / page down"),
        keybind_row("x", "cancel running conversion"),
    ];

    let block = Block::default().borders(Borders::ALL).title("Keybinds");
    let inner = block.inner(popup);
    let visible_line_count = inner.height.max(1) as usize;
    let max_scroll_top = lines.len().saturating_sub(visible_line_count);
    let scroll_top = app.clamp_keybinds_scroll(max_scroll_top);
    let popup_widget = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Left)
        .scroll((scroll_top.min(u16::MAX as usize) as u16, 0));

    frame.render_widget(popup_widget, popup);
}

fn render_rename_prompt(frame: &mut Frame, app: &App) {
    let Some((buffer, cursor, original)) = app.rename_prompt_view() else {
        return;
    };

    let popup = centered_popup(frame.area(), 60, 30);
    frame.render_widget(Clear, popup);

    let cursor_style = Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD);
    let mut input = vec![Span::styled("> ", Style::default().fg(Color::Cyan))];
    let chars = buffer.chars().collect::<Vec<_>>();
    for (index, ch) in chars.iter().enumerate() {
        let style = if index == cursor {
            cursor_style
        } else {
            Style::default()
        };
        input.push(Span::styled(ch.to_string(), style));
    }
    if cursor >= chars.len() {
        input.push(Span::styled(" ", cursor_style));
    }

    let lines = vec![
        Line::from(format!("Current: {original}")),
        Line::from(""),
        Line::from(input),
        Line::from(""),
        Line::styled(
            "Enter to apply, Esc to discard.",
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let popup_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Rename")
                .border_style(pane_border_style(true, Color::LightYellow)),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });

    frame.render_widget(popup_widget, popup);
}

fn render_cancel_confirm_modal(frame: &mut Frame) {
    let popup = centered_popup(frame.area(), 58, 38);
    frame.render_widget(Clear, popup);

    let lines = vec![
        Line::styled(
            "Cancel running conversion?",
            Style::default()
                .fg(Color::LightRed)
                .add_modifier(Modifier::BOLD),
        ),
        Line::from(""),
        Line::from("The partial output file will be removed."),
        Line::from(""),
        Line::from("Press y or Enter to confirm."),
        Line::from("Press n or Esc to keep it running."),
    ];

    let popup_widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Confirm Cancel")
                .border_style(pane_border_style(true, Color::LightRed)),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    frame.render_widget(popup_widget, popup);
}

fn keybind_section(title: &str) -> Line<'static> {
    Line::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn keybind_row(keys: &str, action: &str) -> Line<'static> {
    const KEY_COL_WIDTH: usize = 24;
    let keys_padded = format!("{keys:<KEY_COL_WIDTH$}");
    Line::from(vec![
        Span::styled(
            keys_padded,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(action.to_string()),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let hint = "? keys";
    let status_width = (area.width as usize).saturating_sub(display_width(hint) + 3);
    let line = Line::from(vec![
        Span::styled(
            truncate_to_width(&app.status_message, status_width),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" | "),
        Span::styled(hint, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Left), area);
}

pub(super) fn pane_border_style(is_focused: bool, focused_color: Color) -> Style {
    if is_focused {
        Style::default()
            .fg(focused_color)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn file_size_label(entry: &FileEntry) -> String {
    if entry.is_dir {
        "<DIR>".to_string()
    } else if let Some(bytes) = entry.size_bytes {
        format_size(bytes)
    } else {
        "?".to_string()
    }
}

fn format_file_row(entry: &FileEntry, content_width: usize) -> String {
    let prefix = format!("{} ", file_type_icon(entry));
    let size = file_size_label(entry);
    let prefix_len = display_width(&prefix);
    let size_len = display_width(&size);

    let available_name_width = content_width.saturating_sub(prefix_len + size_len + 1);
    let name = truncate_middle_with_ellipsis(&entry.name, available_name_width);
    let left = format!("{prefix}{name}");
    let left_len = display_width(&left);
    let spaces = content_width.saturating_sub(left_len + size_len).max(1);
    let row = format!("{left}{}{}", " ".repeat(spaces), size);
    truncate_to_width(&row, content_width)
}

fn file_type_icon(entry: &FileEntry) -> &'static str {
    if entry.is_dir {
        ""
    } else if is_video_file(&entry.path) {
        ""
    } else if is_audio_file(&entry.path) {
        ""
    } else {
        ""
    }
}

fn truncate_middle_with_ellipsis(value: &str, max_chars: usize) -> String {
    let width = display_width(value);
    if width <= max_chars {
        return value.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }

    let keep_total = max_chars.saturating_sub(3);
    let keep_left = keep_total / 2;
    let keep_right = keep_total.saturating_sub(keep_left);
    let left = truncate_to_width(value, keep_left);
    let right = take_suffix_width(value, keep_right);

    truncate_to_width(&format!("{left}...{right}"), max_chars)
}

fn display_width(value: &str) -> usize {
    UnicodeWidthStr::width(value)
}

fn truncate_to_width(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let mut result = String::new();
    let mut width = 0;
    for ch in value.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > 0 && width + ch_width > max_width {
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

fn take_suffix_width(value: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }

    let mut suffix = Vec::new();
    let mut width = 0;
    for ch in value.chars().rev() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if ch_width > 0 && width + ch_width > max_width {
            break;
        }
        suffix.push(ch);
        width += ch_width;
    }
    suffix.into_iter().rev().collect()
}

fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.1}G", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.1}M", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.1}K", bytes_f / KB)
    } else {
        format!("{bytes}B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_truncation_keeps_both_ends() {
        assert_eq!(truncate_middle_with_ellipsis("holiday-video.mp4", 11), "holi....mp4");
        assert_eq!(truncate_middle_with_ellipsis("short.mp3", 20), "short.mp3");
        assert_eq!(truncate_middle_with_ellipsis("abcdef", 2), "..");
    }

    #[test]
    fn width_truncation_respects_wide_chars() {
        assert_eq!(truncate_to_width("日本語", 4), "日本");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn sizes_use_binary_units() {
        assert_eq!(format_size(512), "512B");
        assert_eq!(format_size(1536), "1.5K");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0M");
    }
}
