// Entry point and key dispatch.
// - Parses arguments, starts file logging, and checks for ffmpeg.
// - Runs the draw/poll loop and routes keys by modal state, then focus.
mod app;
mod config;
mod convert;
mod error;
mod logging;
mod media;
mod model;
mod rename;
mod ui;

use std::{io, time::Duration};

use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, warn};

use crate::{
    app::App,
    config::{Args, Config, detect_tool_available},
    logging::init_logging,
    model::{Focus, RightTab},
};

enum Flow {
    Continue,
    Quit,
}

fn main() -> io::Result<()> {
    let config = Config::from_args(Args::parse())?;
    let _log_guard = init_logging(&config.log_dir)?;

    let ffmpeg_available = detect_tool_available(&config.tools.ffmpeg);
    if !ffmpeg_available {
        warn!(ffmpeg = %config.tools.ffmpeg.display(), "ffmpeg not found, conversion disabled");
    }
    info!(start_dir = %config.start_dir.display(), "starting");

    let mut app = App::new(&config, ffmpeg_available)?;
    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();
    app.shutdown();
    info!("exiting");
    result
}

fn run(terminal: &mut ratatui::DefaultTerminal, app: &mut App) -> io::Result<()> {
    let mut focus = Focus::Left;

    loop {
        app.tick();
        app.normalize_focus(&mut focus);
        terminal.draw(|frame| ui::render(frame, app, focus))?;

        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && let Flow::Quit = handle_key(app, &mut focus, key)
        {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, focus: &mut Focus, key: KeyEvent) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if app.has_rename_prompt() {
        handle_rename_prompt_key(app, key, ctrl);
        return Flow::Continue;
    }

    if app.has_pending_cancel() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => app.confirm_pending_cancel(),
            KeyCode::Char('n') | KeyCode::Esc => app.cancel_pending_cancel(),
            _ => {}
        }
        return Flow::Continue;
    }

    if ctrl && key.code == KeyCode::Char('c') {
        return Flow::Quit;
    }

    if app.show_keybinds {
        match key.code {
            KeyCode::Char('?') => app.hide_keybinds(),
            KeyCode::Esc => {
                app.hide_keybinds();
                *focus = Focus::Left;
            }
            KeyCode::Down | KeyCode::Char('j') => app.scroll_keybinds_down(),
            KeyCode::Up | KeyCode::Char('k') => app.scroll_keybinds_up(),
            KeyCode::PageDown => app.page_keybinds_down(),
            KeyCode::PageUp => app.page_keybinds_up(),
            KeyCode::Char('d') if ctrl => app.page_keybinds_down(),
            KeyCode::Char('u') if ctrl => app.page_keybinds_up(),
            _ => {}
        }
        return Flow::Continue;
    }

    if ctrl {
        handle_ctrl_key(app, focus, key.code);
        return Flow::Continue;
    }

    let form_input = app.should_treat_char_as_form_input(*focus);
    if let KeyCode::Char(ch) = key.code
        && !form_input
    {
        match ch {
            '?' => {
                app.toggle_keybinds();
                return Flow::Continue;
            }
            'q' => return Flow::Quit,
            '1' | '2' => {
                if let Some(number) = ch.to_digit(10) {
                    app.select_right_tab_by_number(number as usize);
                    app.normalize_focus(focus);
                }
                return Flow::Continue;
            }
            _ => {}
        }
    }
    if key.code == KeyCode::Esc {
        *focus = Focus::Left;
        return Flow::Continue;
    }

    match *focus {
        Focus::Left => handle_playlist_key(app, key.code),
        Focus::RightTop => handle_right_top_key(app, key.code),
        Focus::RightBottom => handle_output_key(app, key.code),
    }
    Flow::Continue
}

fn handle_rename_prompt_key(app: &mut App, key: KeyEvent, ctrl: bool) {
    match key.code {
        KeyCode::Esc => app.cancel_rename(),
        KeyCode::Enter => app.commit_rename(),
        KeyCode::Backspace => app.backspace_rename(),
        KeyCode::Left => app.move_rename_cursor(false),
        KeyCode::Right => app.move_rename_cursor(true),
        KeyCode::Char(ch) if !ctrl => app.push_rename_char(ch),
        _ => {}
    }
}

fn handle_ctrl_key(app: &mut App, focus: &mut Focus, code: KeyCode) {
    match code {
        KeyCode::Char('h') | KeyCode::Left => *focus = Focus::Left,
        KeyCode::Char('l') | KeyCode::Right => *focus = Focus::RightTop,
        KeyCode::Char('o') if app.can_focus_right_bottom() => *focus = Focus::RightBottom,
        KeyCode::Char('j') | KeyCode::Down => *focus = app.next_focus(*focus),
        KeyCode::Char('k') | KeyCode::Up => *focus = app.previous_focus(*focus),
        KeyCode::Char('n') => {
            app.select_next_right_tab();
            app.normalize_focus(focus);
        }
        KeyCode::Char('d') => match *focus {
            Focus::Left => app.page_files_down(),
            Focus::RightBottom => app.page_convert_output_down(),
            Focus::RightTop => {}
        },
        KeyCode::Char('u') => match *focus {
            Focus::Left => app.page_files_up(),
            Focus::RightBottom => app.page_convert_output_up(),
            Focus::RightTop => {}
        },
        _ => {}
    }
}

fn handle_playlist_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Down | KeyCode::Char('j') => app.next(),
        KeyCode::Up | KeyCode::Char('k') => app.previous(),
        KeyCode::PageDown => app.page_files_down(),
        KeyCode::PageUp => app.page_files_up(),
        KeyCode::Char('e') | KeyCode::F(2) => app.begin_rename_selected(),
        KeyCode::Char('u') => app.undo_rename(),
        KeyCode::Char('U') => app.redo_rename(),
        _ => {
            let result = match code {
                KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                    app.activate_selected_entry()
                }
                KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
                    app.go_parent_dir()
                }
                KeyCode::Char('_') => app.go_initial_dir(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Char('s') => app.cycle_sort_order(),
                _ => Ok(()),
            };
            if let Err(err) = result {
                warn!(%err, "playlist action failed");
                app.status_message = format!("Directory error: {err}");
            }
        }
    }
}

fn handle_right_top_key(app: &mut App, code: KeyCode) {
    if app.right_tab() == RightTab::Renames {
        match code {
            KeyCode::Char('u') => app.undo_rename(),
            KeyCode::Char('U') => app.redo_rename(),
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Tab | KeyCode::Down => app.next_input(),
        KeyCode::BackTab | KeyCode::Up => app.previous_input(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Backspace => app.backspace_active_input(),
        KeyCode::Enter => app.run_conversion(),
        KeyCode::Char(ch) => app.push_active_input_char(ch),
        _ => {}
    }
}

fn handle_output_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Down | KeyCode::Char('j') => app.scroll_convert_output_down(),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_convert_output_up(),
        KeyCode::PageDown => app.page_convert_output_down(),
        KeyCode::PageUp => app.page_convert_output_up(),
        KeyCode::Char('x') => app.request_cancel(),
        _ => {}
    }
}
