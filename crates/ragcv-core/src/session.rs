//! The document session: composition root for query, compile and log polling.
//!
//! `Session` is the single writer of all session state. Spawned requests and
//! timers never mutate it; they post [`SessionEvent`]s to the receiver returned
//! by [`Session::new`], and the owner feeds them back through
//! [`Session::handle`] on its own event loop.

use std::fmt::Write as _;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::api::{Backend, GeneratedResult};
use crate::config::SessionConfig;
use crate::debounce::EditCoalescer;
use crate::flight::{Settled, SingleFlight};
use crate::guard::ManualEditGuard;
use crate::poll::PollLoop;
use crate::resource::{BlobStore, RenderedHandle, ResourceManager};
use crate::state::{OpKind, Phase, Tab};

#[derive(Debug)]
pub enum SessionEvent {
    Query(Settled<GeneratedResult>),
    Compile(Settled<Vec<u8>>),
    Logs(Settled<String>),
    EditQuiesced { seq: u64 },
    PollTick { seq: u64 },
}

pub struct Session {
    backend: Arc<dyn Backend>,
    events: UnboundedSender<SessionEvent>,

    query: SingleFlight<GeneratedResult>,
    compile: SingleFlight<Vec<u8>>,
    logs: SingleFlight<String>,

    rendered: ResourceManager,
    coalescer: EditCoalescer,
    guard: ManualEditGuard,
    poller: PollLoop,

    last_query: Option<String>,
    result: Option<GeneratedResult>,
    source: String,
    log_buffer: String,
    logs_received: bool,
    active_tab: Tab,
    shut_down: bool,
}

impl Session {
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Box<dyn BlobStore>,
        config: SessionConfig,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            backend,
            events,
            query: SingleFlight::new(OpKind::Query),
            compile: SingleFlight::new(OpKind::Compile),
            logs: SingleFlight::new(OpKind::LogFetch),
            rendered: ResourceManager::new(store),
            coalescer: EditCoalescer::new(config.debounce),
            guard: ManualEditGuard::new(),
            poller: PollLoop::new(config.poll_interval),
            last_query: None,
            result: None,
            source: String::new(),
            log_buffer: String::new(),
            logs_received: false,
            active_tab: Tab::default(),
            shut_down: false,
        };
        (session, rx)
    }

    // User operations

    /// Supersedes any in-flight query and clears the previous result.
    ///
    /// Blank input is refused without touching state. Returns whether a request was issued.
    pub fn submit_query(&mut self, text: &str) -> bool {
        let text = text.trim();
        if self.shut_down || text.is_empty() {
            return false;
        }

        self.result = None;
        self.last_query = Some(text.to_string());

        let backend = Arc::clone(&self.backend);
        let payload = text.to_string();
        self.query.start(
            async move { backend.query(&payload).await },
            &self.events,
            SessionEvent::Query,
        );
        true
    }

    /// Records a user edit: latches the guard, shows the text immediately,
    /// and defers the compile until edits quiesce.
    pub fn edit_source(&mut self, text: impl Into<String>) {
        if self.shut_down {
            return;
        }
        let text = text.into();
        self.guard.note_manual_edit();
        self.source = text.clone();
        self.coalescer
            .on_edit(text, &self.events, |seq| SessionEvent::EditQuiesced { seq });
    }

    /// Compiles the current source now, dropping any pending debounced compile.
    pub fn compile_now(&mut self) {
        if self.shut_down {
            return;
        }
        self.coalescer.cancel();
        let source = self.source.clone();
        self.start_compile(source);
    }

    /// Disabling also cancels the in-flight fetch so nothing it returns is shown.
    pub fn set_auto_refresh(&mut self, enabled: bool) {
        if self.shut_down {
            return;
        }
        let changed = self
            .poller
            .set_enabled(enabled, &self.events, |seq| SessionEvent::PollTick { seq });
        if changed && !enabled {
            self.logs.cancel();
        }
    }

    /// One log fetch regardless of the auto-refresh flag
    pub fn refresh_logs(&mut self) {
        if self.shut_down {
            return;
        }
        self.start_log_fetch();
    }

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn copy_active_tab_content(&self) -> Option<String> {
        self.tab_content(self.active_tab)
    }

    /// Copyable text of a tab; `None` when the tab has nothing to offer.
    pub fn tab_content(&self, tab: Tab) -> Option<String> {
        let text = match tab {
            Tab::Output => self.result.as_ref().map(|r| r.result.clone()),
            Tab::Summary => self
                .result
                .as_ref()
                .map(|r| r.summary_text().to_string()),
            Tab::Artifacts => self.result.as_ref().map(format_artifacts),
            Tab::Typeset => Some(self.source.clone()),
            Tab::Logs => Some(self.log_buffer.clone()),
        };
        text.filter(|t| !t.is_empty())
    }

    // Event application

    pub fn handle(&mut self, event: SessionEvent) {
        if self.shut_down {
            tracing::trace!(?event, "event after shutdown ignored");
            return;
        }

        match event {
            SessionEvent::Query(settled) => self.apply_query(settled),
            SessionEvent::Compile(settled) => self.apply_compile(settled),
            SessionEvent::Logs(settled) => self.apply_logs(settled),
            SessionEvent::EditQuiesced { seq } => {
                if let Some(source) = self.coalescer.fire(seq) {
                    self.start_compile(source);
                }
            }
            SessionEvent::PollTick { seq } => {
                if self.poller.accept(seq) {
                    self.start_log_fetch();
                }
            }
        }
    }

    fn apply_query(&mut self, settled: Settled<GeneratedResult>) {
        let Some(outcome) = self.query.settle(settled) else {
            return;
        };
        let Ok(result) = outcome else {
            return;
        };

        tracing::info!(
            chars = result.result.len(),
            artifacts = result.artifacts.len(),
            "query result received"
        );

        // a fresh result starts a new document
        self.guard.reset();
        self.coalescer.cancel();
        if let Some(source) = self.guard.try_auto_populate(&result.result) {
            self.source = source.clone();
            self.start_compile(source);
        }
        self.result = Some(result);
    }

    fn apply_compile(&mut self, settled: Settled<Vec<u8>>) {
        let Some(Ok(pdf)) = self.compile.settle(settled) else {
            return;
        };

        match self.rendered.replace(&pdf) {
            Ok(handle) => {
                tracing::info!(id = handle.id(), bytes = handle.len(), "rendered document updated");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to store rendered document");
                self.compile
                    .set_error(format!("Could not store rendered document: {:#}", e));
            }
        }
    }

    fn apply_logs(&mut self, settled: Settled<String>) {
        match self.logs.settle(settled) {
            Some(Ok(snapshot)) => {
                self.log_buffer = snapshot;
                self.logs_received = true;
            }
            Some(Err(message)) => {
                if !self.logs_received {
                    self.log_buffer = format!("Error fetching logs: {}", message);
                }
            }
            None => {}
        }
    }

    fn start_compile(&mut self, source: String) {
        let backend = Arc::clone(&self.backend);
        self.compile.start(
            async move { backend.compile(&source).await },
            &self.events,
            SessionEvent::Compile,
        );
    }

    fn start_log_fetch(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.logs.start(
            async move { backend.fetch_logs().await },
            &self.events,
            SessionEvent::Logs,
        );
    }

    /// Ends the session: disarm the debounce timer, stop polling, cancel every
    /// request kind, then release the rendered handle. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.coalescer.cancel();
        self.poller
            .set_enabled(false, &self.events, |seq| SessionEvent::PollTick { seq });
        self.query.cancel();
        self.compile.cancel();
        self.logs.cancel();
        self.rendered.release_all();
        tracing::info!("session shut down");
    }

    // Read-only projections

    pub fn phase(&self, kind: OpKind) -> Phase {
        match kind {
            OpKind::Query => self.query.phase(),
            OpKind::Compile => self.compile.phase(),
            OpKind::LogFetch => self.logs.phase(),
        }
    }

    pub fn is_loading(&self, kind: OpKind) -> bool {
        self.phase(kind) == Phase::Pending
    }

    pub fn error(&self, kind: OpKind) -> Option<&str> {
        match kind {
            OpKind::Query => self.query.error(),
            OpKind::Compile => self.compile.error(),
            OpKind::LogFetch => self.logs.error(),
        }
    }

    pub fn rendered(&self) -> Option<&RenderedHandle> {
        self.rendered.current()
    }

    pub fn outstanding_handles(&self) -> u64 {
        self.rendered.outstanding()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn log_buffer(&self) -> &str {
        &self.log_buffer
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn is_auto_refresh(&self) -> bool {
        self.poller.is_enabled()
    }

    pub fn is_manually_edited(&self) -> bool {
        self.guard.is_latched()
    }

    pub fn is_edit_pending(&self) -> bool {
        self.coalescer.is_pending()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn format_artifacts(result: &GeneratedResult) -> String {
    let mut out = String::new();
    for (i, artifact) in result.artifacts.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] score {:.3} | {} tokens | {}",
            i + 1,
            artifact.retrieval_score,
            artifact.chunk_length_tokens,
            artifact.source.as_deref().unwrap_or("unknown source")
        );
        let _ = writeln!(out, "{}\n", artifact.text.trim());
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Artifact;
    use crate::resource::TempFileStore;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    struct OfflineBackend;

    #[async_trait]
    impl Backend for OfflineBackend {
        async fn query(&self, _text: &str) -> Result<GeneratedResult> {
            Err(anyhow!("offline"))
        }

        async fn compile(&self, _source: &str) -> Result<Vec<u8>> {
            Err(anyhow!("offline"))
        }

        async fn fetch_logs(&self) -> Result<String> {
            Err(anyhow!("offline"))
        }
    }

    fn offline_session() -> (Session, UnboundedReceiver<SessionEvent>) {
        Session::new(
            Arc::new(OfflineBackend),
            Box::new(TempFileStore::new()),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_blank_query_refused() {
        let (mut session, _rx) = offline_session();
        assert!(!session.submit_query("   \n"));
        assert!(!session.is_loading(OpKind::Query));
        assert_eq!(session.last_query(), None);
    }

    #[tokio::test]
    async fn test_tab_content() {
        let (mut session, _rx) = offline_session();
        assert_eq!(session.copy_active_tab_content(), None);

        session.result = Some(GeneratedResult {
            result: "Dear Hiring Manager,".to_string(),
            summary: None,
            artifacts: vec![Artifact {
                text: "Built a compiler ".to_string(),
                retrieval_score: 0.5,
                chunk_length_tokens: 12,
                source: Some("cv.md".to_string()),
                metadata: Default::default(),
            }],
        });
        session.source = "\\documentclass{article}".to_string();

        assert_eq!(session.copy_active_tab_content().as_deref(), Some("Dear Hiring Manager,"));
        assert_eq!(session.tab_content(Tab::Summary), None);
        assert_eq!(
            session.tab_content(Tab::Artifacts).as_deref(),
            Some("[1] score 0.500 | 12 tokens | cv.md\nBuilt a compiler")
        );

        session.set_active_tab(Tab::Typeset);
        assert_eq!(session.copy_active_tab_content().as_deref(), Some("\\documentclass{article}"));
    }

    #[tokio::test]
    async fn test_operations_after_shutdown_are_inert() {
        let (mut session, _rx) = offline_session();
        session.shutdown();
        session.shutdown();

        assert!(!session.submit_query("Senior Backend Engineer"));
        session.edit_source("edited");
        session.set_auto_refresh(true);
        session.refresh_logs();

        assert_eq!(session.source(), "");
        assert!(!session.is_auto_refresh());
        for kind in OpKind::all() {
            assert!(!session.is_loading(kind));
        }
    }
}
