//! Coalesces bursts of source edits into one downstream compile.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(1000);

/// Holds the latest edit and a single restartable quiescence timer.
///
/// Every edit cancels the running timer and arms a fresh one tagged with a new
/// sequence number. When a timer elapses it posts its sequence; [`fire`] only
/// yields the source if that sequence is still the armed one.
///
/// [`fire`]: EditCoalescer::fire
pub struct EditCoalescer {
    window: Duration,
    seq: u64,
    timer: Option<CancellationToken>,
    latest: Option<String>,
}

impl EditCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seq: 0,
            timer: None,
            latest: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn on_edit<E>(&mut self, source: String, events: &UnboundedSender<E>, wrap: fn(u64) -> E)
    where
        E: Send + 'static,
    {
        self.latest = Some(source);
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }

        self.seq += 1;
        let seq = self.seq;
        let cancel = CancellationToken::new();
        self.timer = Some(cancel.clone());

        let window = self.window;
        let events = events.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(window) => {
                    let _ = events.send(wrap(seq));
                }
            }
        });
    }

    /// Takes the pending source if `seq` is the armed timer.
    pub fn fire(&mut self, seq: u64) -> Option<String> {
        if self.timer.is_none() || seq != self.seq {
            tracing::trace!(seq, armed = self.seq, "stale debounce timer ignored");
            return None;
        }
        self.timer = None;
        self.latest.take()
    }

    /// Disarms the timer and forgets the pending source without firing.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
            tracing::debug!(seq = self.seq, "pending edit discarded");
        }
        self.latest = None;
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_edit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut coalescer = EditCoalescer::new(DEFAULT_QUIESCENCE);

        coalescer.on_edit("a".to_string(), &tx, |seq| seq);
        sleep(Duration::from_millis(200)).await;
        coalescer.on_edit("ab".to_string(), &tx, |seq| seq);
        sleep(Duration::from_millis(200)).await;
        let last_edit = Instant::now();
        coalescer.on_edit("abc".to_string(), &tx, |seq| seq);

        let seq = rx.recv().await.unwrap();
        let waited = Instant::now() - last_edit;
        assert!(waited >= DEFAULT_QUIESCENCE && waited < DEFAULT_QUIESCENCE + Duration::from_millis(5));
        assert_eq!(coalescer.fire(seq), Some("abc".to_string()));
        assert!(!coalescer.is_pending());

        // no other timer survived the burst
        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_trailing_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut coalescer = EditCoalescer::new(Duration::from_millis(300));

        coalescer.on_edit("draft".to_string(), &tx, |seq| seq);
        coalescer.cancel();

        assert!(timeout(Duration::from_secs(2), rx.recv()).await.is_err());
        assert_eq!(coalescer.fire(1), None);
    }

    #[tokio::test]
    async fn test_fire_rejects_superseded_sequence() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut coalescer = EditCoalescer::new(Duration::from_millis(50));
        coalescer.on_edit("one".to_string(), &tx, |seq| seq);
        coalescer.on_edit("two".to_string(), &tx, |seq| seq);

        assert_eq!(coalescer.fire(1), None);
        assert!(coalescer.is_pending());
        assert_eq!(coalescer.fire(2), Some("two".to_string()));
    }
}
