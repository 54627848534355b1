// Convert-tab rendering.
// - Shows the selected source and what ffprobe reported about it.
// - Renders the conversion form with the active field highlighted.
// - Renders the streamed tool output beneath the form.
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{
    app::App,
    media::{format_bitrate, format_duration},
    model::{ConvertField, Focus},
};

use super::super::{
    output_panel::{LogPanelStateView, render_log_panel},
    pane_border_style,
};

const INPUT_LABEL_COL_WIDTH: usize = 11;

pub fn render_convert_tab(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    let right_constraints = if focus == Focus::RightBottom {
        [Constraint::Percentage(30), Constraint::Percentage(70)]
    } else {
        [Constraint::Min(0), Constraint::Length(10)]
    };
    let [top, bottom] = Layout::vertical(right_constraints).areas(area);

    render_form_pane(frame, app, focus, top);
    render_tool_output_pane(frame, app, focus, bottom);
}

fn render_form_pane(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    let mut lines = Vec::new();
    if !app.ffmpeg_available() {
        lines.push(warning_line(
            "WARNING: ffmpeg not found. Conversion is disabled.",
        ));
        lines.push(warning_line(
            "Install ffmpeg or pass --ffmpeg, then restart this app.",
        ));
        lines.push(Line::from(""));
    }

    match &app.source {
        Some(source) => {
            let filename = source
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.path.display().to_string());
            lines.push(form_row("Source", filename));
            lines.push(form_row("Path", source.path.display().to_string()));
            lines.push(Line::from(""));
            lines.push(form_section("MEDIA INFO"));

            if let Some(metadata) = &source.metadata {
                let duration = metadata
                    .duration_seconds()
                    .map(format_duration)
                    .unwrap_or_else(|| "unknown".to_string());
                lines.push(form_row("Duration", duration));
                if let Some((width, height)) = metadata.dimensions() {
                    lines.push(form_row("Frame", format!("{width}x{height}")));
                    lines.push(form_row(
                        "Rotation",
                        format!("{}°", metadata.rotation_degrees()),
                    ));
                }
                let audio = match metadata.audio_stream() {
                    Some(stream) => {
                        let codec = stream.codec_name.as_deref().unwrap_or("?");
                        match metadata.audio_bit_rate() {
                            0 => codec.to_string(),
                            rate => format!("{codec} @ {}", format_bitrate(rate)),
                        }
                    }
                    None => "none".to_string(),
                };
                lines.push(form_row("Audio", audio));
            } else {
                let reason = source.probe_error.as_deref().unwrap_or("unavailable");
                lines.push(form_row("Info", reason.to_string()));
            }
        }
        None => {
            lines.push(form_section("NO MEDIA SELECTED"));
            lines.push(Line::from(""));
            lines.push(Line::from("Select a video or audio file in the left pane and press Enter."));
        }
    }

    lines.push(Line::from(""));
    lines.push(form_section("CONVERSION"));
    lines.push(Line::from(""));

    let active = |field: ConvertField| focus == Focus::RightTop && app.active_field == field;
    lines.push(choice_input_line(
        "Format",
        app.format.label(),
        active(ConvertField::Format),
    ));
    if app.field_enabled(ConvertField::FrameSize) {
        lines.push(choice_input_line(
            "Frame size",
            app.options.frame_size.label(),
            active(ConvertField::FrameSize),
        ));
        lines.push(choice_input_line(
            "Rotation",
            app.options.rotation.label(),
            active(ConvertField::Rotation),
        ));
    } else {
        lines.push(disabled_input_line("Frame size", "n/a for audio output"));
        lines.push(disabled_input_line("Rotation", "n/a for audio output"));
    }
    lines.push(choice_input_line(
        "Audio rate",
        app.options.audio_bitrate.label(),
        active(ConvertField::AudioBitrate),
    ));
    let mut volume = input_line(
        "Volume x",
        &app.options.audio_volume,
        active(ConvertField::Volume).then_some(app.volume_cursor),
    );
    if app.options.normalize_volume {
        volume.spans.push(Span::styled(
            "  applied after normalizing",
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(volume);
    lines.push(checkbox_input_line(
        "Normalize",
        app.options.normalize_volume,
        active(ConvertField::Normalize),
    ));
    lines.push(input_line(
        "Output",
        &app.output_name,
        active(ConvertField::Output).then_some(app.output_cursor),
    ));
    lines.push(Line::from(""));

    if let Some(stage) = app.conversion_stage_label() {
        lines.push(Line::styled(
            format!("{} {stage}...  (x in output pane to cancel)", app.spinner()),
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        lines.push(Line::styled(
            "Press Enter to convert.",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let form = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(pane_border_style(
                    focus == Focus::RightTop,
                    Color::LightYellow,
                ))
                .title("Convert"),
        )
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });

    frame.render_widget(form, area);
}

fn render_tool_output_pane(frame: &mut Frame, app: &App, focus: Focus, area: Rect) {
    let visible_line_count = area.height.saturating_sub(2) as usize;
    render_log_panel(
        frame,
        area,
        LogPanelStateView {
            title: "TOOL OUTPUT",
            lines: app.convert_output.lines(),
            scroll: app
                .convert_output
                .clamped_scroll_for_viewport(visible_line_count),
            focused: focus == Focus::RightBottom,
            accent_color: Color::LightMagenta,
            trim_wrapped_lines: false,
        },
    );
}

fn form_section(title: &str) -> Line<'static> {
    Line::styled(
        title.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )
}

fn warning_line(message: &str) -> Line<'static> {
    Line::styled(
        message.to_string(),
        Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
    )
}

fn form_row(label: &str, value: String) -> Line<'static> {
    const LABEL_COL_WIDTH: usize = 10;
    const VALUE_MAX_CHARS: usize = 64;
    let label_cell = format!("{label:<LABEL_COL_WIDTH$}");
    Line::from(vec![
        Span::styled(
            label_cell,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::raw(truncate_tail(&value, VALUE_MAX_CHARS)),
    ])
}

fn input_line(label: &str, value: &str, active_cursor: Option<usize>) -> Line<'static> {
    let label_cell = format!("{label:<INPUT_LABEL_COL_WIDTH$}");
    let active = active_cursor.is_some();
    let value_style = input_value_style(active);
    let cursor_style = Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD);

    let mut spans = vec![
        Span::styled(label_cell, input_label_style(active)),
        Span::raw("  "),
    ];

    let chars = value.chars().collect::<Vec<_>>();
    let cursor = active_cursor.unwrap_or(0).min(chars.len());
    for (index, ch) in chars.iter().enumerate() {
        let style = if active && index == cursor {
            cursor_style
        } else {
            value_style
        };
        spans.push(Span::styled(ch.to_string(), style));
    }
    if active && cursor == chars.len() {
        spans.push(Span::styled(" ".to_string(), cursor_style));
    }

    Line::from(spans)
}

fn choice_input_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_cell = format!("{label:<INPUT_LABEL_COL_WIDTH$}");
    let value = if active {
        format!("< {value} >")
    } else {
        value.to_string()
    };

    Line::from(vec![
        Span::styled(label_cell, input_label_style(active)),
        Span::raw("  "),
        Span::styled(value, input_value_style(active)),
    ])
}

fn disabled_input_line(label: &str, value: &str) -> Line<'static> {
    let label_cell = format!("{label:<INPUT_LABEL_COL_WIDTH$}");
    Line::from(vec![
        Span::styled(
            label_cell,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(value.to_string(), Style::default().fg(Color::DarkGray)),
    ])
}

fn checkbox_input_line(label: &str, checked: bool, active: bool) -> Line<'static> {
    let label_cell = format!("{label:<INPUT_LABEL_COL_WIDTH$}");
    let mark = if checked { "[x]" } else { "[ ]" };

    Line::from(vec![
        Span::styled(label_cell, input_label_style(active)),
        Span::raw("  "),
        Span::styled(mark.to_string(), input_value_style(active)),
    ])
}

fn input_label_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::LightMagenta)
            .add_modifier(Modifier::BOLD)
    }
}

fn input_value_style(active: bool) -> Style {
    if active {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Gray)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

/// Keeps the end of long paths visible.
fn truncate_tail(value: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }

    let char_count = value.chars().count();
    if char_count <= max_chars {
        return value.to_string();
    }
    if max_chars == 1 {
        return "…".to_string();
    }

    let keep = max_chars - 1;
    let tail = value
        .chars()
        .skip(char_count.saturating_sub(keep))
        .collect::<String>();
    format!("…{tail}")
}
