use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ragcv_core::Tab;

use crate::app::{App, EditTarget, InputMode};
use crate::tui::TermEvent;

const PAGE: u16 = 10;

pub fn handle_event(app: &mut App, event: TermEvent) {
    match event {
        TermEvent::Key(key) => handle_key(app, key),
        TermEvent::Mouse(mouse) => handle_mouse(app, mouse),
        TermEvent::Resize(_, _) => {}
        TermEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match (app.input_mode, app.edit_target) {
        (InputMode::Normal, _) => handle_normal_mode(app, key),
        (InputMode::Editing, EditTarget::Query) => handle_query_editing(app, key),
        (InputMode::Editing, EditTarget::Source) => handle_source_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    app.status = None;

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Tabs
        KeyCode::Tab | KeyCode::Char('l') => app.next_tab(),
        KeyCode::BackTab | KeyCode::Char('h') => app.prev_tab(),
        KeyCode::Char(c @ '1'..='5') => {
            let index = c as usize - '1' as usize;
            app.select_tab(Tab::all()[index]);
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::PageDown | KeyCode::Char('d') => app.scroll_down(PAGE),
        KeyCode::PageUp | KeyCode::Char('u') => app.scroll_up(PAGE),
        KeyCode::Char('g') => app.scroll_top(),

        // Editing
        KeyCode::Char('i') | KeyCode::Char('/') => app.start_editing(),
        KeyCode::Enter if app.active_tab() == Tab::Output => app.submit_query(),

        // Actions
        KeyCode::Char('c') => copy_active_tab(app),
        KeyCode::Char('b') => app.session.compile_now(),
        KeyCode::Char('o') => open_rendered(app),
        KeyCode::Char('r') => {
            let enabled = !app.session.is_auto_refresh();
            app.session.set_auto_refresh(enabled);
            app.status = Some(format!(
                "Auto-refresh {}",
                if enabled { "on" } else { "off" }
            ));
        }
        KeyCode::Char('R') => app.session.refresh_logs(),
        _ => {}
    }
}

fn handle_query_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.stop_editing(),
        KeyCode::Enter => {
            app.submit_query();
            app.stop_editing();
        }
        KeyCode::Backspace => app.query_backspace(),
        KeyCode::Left => app.query_left(),
        KeyCode::Right => app.query_right(),
        KeyCode::Home => app.query_home(),
        KeyCode::End => app.query_end(),
        KeyCode::Char(c) => app.query_insert(c),
        _ => {}
    }
}

fn handle_source_editing(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.session.compile_now();
        return;
    }

    match key.code {
        KeyCode::Esc => app.stop_editing(),
        KeyCode::Enter => app.source_insert("\n"),
        KeyCode::Tab => app.source_insert("  "),
        KeyCode::Backspace => app.source_backspace(),
        KeyCode::Delete => app.source_delete(),
        KeyCode::Left => app.source_left(),
        KeyCode::Right => app.source_right(),
        KeyCode::Up => app.source_up(),
        KeyCode::Down => app.source_down(),
        KeyCode::Home => app.source_home(),
        KeyCode::End => app.source_end(),
        KeyCode::Char(c) => {
            let mut buf = [0u8; 4];
            app.source_insert(c.encode_utf8(&mut buf));
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

fn copy_active_tab(app: &mut App) {
    let Some(text) = app.session.copy_active_tab_content() else {
        app.status = Some("Nothing to copy".to_string());
        return;
    };

    app.status = Some(match copy_to_clipboard(&text) {
        Ok(()) => format!("Copied {} to clipboard", app.active_tab().title()),
        Err(e) => {
            tracing::warn!("clipboard copy failed: {:#}", e);
            format!("Copy failed: {}", e)
        }
    });
}

fn open_rendered(app: &mut App) {
    let Some(handle) = app.session.rendered() else {
        app.status = Some("No rendered document yet".to_string());
        return;
    };

    app.status = Some(match open_in_viewer(handle.path()) {
        Ok(()) => format!("Opened {}", handle.path().display()),
        Err(e) => {
            tracing::warn!("opening rendered document failed: {:#}", e);
            format!("Open failed: {}", e)
        }
    });
}

/// First clipboard tool found on PATH wins.
fn copy_to_clipboard(text: &str) -> Result<()> {
    const TOOLS: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (program, args) in TOOLS {
        let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if status.success() {
            return Ok(());
        }
        return Err(anyhow!("{} exited with {}", program, status));
    }

    Err(anyhow!("no clipboard tool found (pbcopy, wl-copy, xclip)"))
}

fn open_in_viewer(path: &Path) -> Result<()> {
    let program = if cfg!(target_os = "macos") { "open" } else { "xdg-open" };
    Command::new(program)
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("{}: {}", program, e))?;
    Ok(())
}
