use std::sync::Arc;

use anyhow::Result;
use ragcv_core::{BackendClient, Config, Session, SessionEvent, TempFileStore};
use tokio::sync::mpsc::UnboundedReceiver;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = match logging::init() {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {:#}", e);
            None
        }
    };

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("could not read config, using defaults: {:#}", e);
        Config::new()
    });
    let base_url = config.base_url();
    tracing::info!(%base_url, "starting ragcv");

    let client = BackendClient::new(&base_url);
    let (mut session, mut session_events) = Session::new(
        Arc::new(client),
        Box::new(TempFileStore::new()),
        config.session_config(),
    );
    if config.auto_refresh() {
        session.set_auto_refresh(true);
    }

    let mut app = App::new(session, base_url, log_path);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut terminal, &mut app, &mut events, &mut session_events).await;

    app.session.shutdown();
    tui::restore()?;
    if let Some(path) = &app.log_path {
        tracing::info!("session closed; log at {}", path.display());
    }
    result
}

/// Terminal input and session updates are both applied on this task.
async fn run(
    terminal: &mut Tui,
    app: &mut App,
    events: &mut EventHandler,
    session_events: &mut UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(update) = session_events.recv() => app.session.handle(update),
            else => break,
        }
    }
    Ok(())
}
