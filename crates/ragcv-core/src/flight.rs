//! Single-flight request control.
//!
//! Each request kind owns one [`SingleFlight`]. Starting a request cancels the
//! previous request of that kind and bumps the generation. The spawned task
//! never touches session state; it posts a [`Settled`] value back through the
//! session's event channel, and [`SingleFlight::settle`] only hands the outcome
//! over if it still carries the live generation. Whether the transport honours
//! the cancellation is irrelevant to correctness.

use std::future::Future;
use std::marker::PhantomData;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::state::{OpKind, Phase};

/// Completion of one request, tagged with the generation it was started under
#[derive(Debug)]
pub struct Settled<T> {
    pub generation: u64,
    pub outcome: Result<T, String>,
}

pub struct SingleFlight<T> {
    kind: OpKind,
    generation: u64,
    live: Option<CancellationToken>,
    error: Option<String>,
    _output: PhantomData<fn() -> T>,
}

impl<T: Send + 'static> SingleFlight<T> {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            generation: 0,
            live: None,
            error: None,
            _output: PhantomData,
        }
    }

    /// Starts `request`, superseding whatever was pending for this kind.
    ///
    /// The previous error is cleared optimistically. Returns the new generation.
    pub fn start<E, F>(
        &mut self,
        request: F,
        events: &UnboundedSender<E>,
        wrap: fn(Settled<T>) -> E,
    ) -> u64
    where
        E: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        if let Some(previous) = self.live.take() {
            previous.cancel();
            tracing::debug!(
                kind = self.kind.as_str(),
                generation = self.generation,
                "request superseded"
            );
        }

        self.generation += 1;
        self.error = None;

        let generation = self.generation;
        let kind = self.kind;
        let cancel = CancellationToken::new();
        self.live = Some(cancel.clone());

        let events = events.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::trace!(kind = kind.as_str(), generation, "request cancelled");
                    return;
                }
                result = request => result.map_err(|e| format!("{:#}", e)),
            };
            let _ = events.send(wrap(Settled { generation, outcome }));
        });

        tracing::debug!(kind = kind.as_str(), generation, "request started");
        generation
    }

    /// Accepts a completion if it belongs to the live request.
    ///
    /// Stale or post-cancel completions yield `None` and leave every slot
    /// untouched, errors included. A failure is recorded in the error slot
    /// before being handed back.
    pub fn settle(&mut self, settled: Settled<T>) -> Option<Result<T, String>> {
        if self.live.is_none() || settled.generation != self.generation {
            tracing::trace!(
                kind = self.kind.as_str(),
                generation = settled.generation,
                live = self.generation,
                "stale completion discarded"
            );
            return None;
        }

        self.live = None;
        match &settled.outcome {
            Ok(_) => tracing::debug!(kind = self.kind.as_str(), generation = settled.generation, "request succeeded"),
            Err(message) => {
                tracing::warn!(kind = self.kind.as_str(), generation = settled.generation, error = %message, "request failed");
                self.error = Some(message.clone());
            }
        }
        Some(settled.outcome)
    }

    /// Cancels the live request without starting another; its completion will be discarded.
    pub fn cancel(&mut self) {
        if let Some(live) = self.live.take() {
            live.cancel();
            tracing::debug!(kind = self.kind.as_str(), generation = self.generation, "request cancelled");
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_pending(&self) -> bool {
        self.live.is_some()
    }

    pub fn phase(&self) -> Phase {
        if self.is_pending() {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
