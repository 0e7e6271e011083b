//! Interval-driven log polling.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Posts a tick immediately on enable and then once per interval until disabled.
///
/// Ticks carry the sequence of the enable that produced them, so a tick that
/// was already queued when the loop was disabled (or re-enabled) is refused by
/// [`PollLoop::accept`].
pub struct PollLoop {
    interval: Duration,
    seq: u64,
    task: Option<CancellationToken>,
}

impl PollLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            seq: 0,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns whether the enabled state changed.
    pub fn set_enabled<E>(&mut self, enabled: bool, events: &UnboundedSender<E>, wrap: fn(u64) -> E) -> bool
    where
        E: Send + 'static,
    {
        if !enabled {
            return match self.task.take() {
                Some(task) => {
                    task.cancel();
                    tracing::info!(seq = self.seq, "log polling disabled");
                    true
                }
                None => false,
            };
        }

        if self.task.is_some() {
            return false;
        }

        self.seq += 1;
        let seq = self.seq;
        let cancel = CancellationToken::new();
        self.task = Some(cancel.clone());

        let period = self.interval;
        let events = events.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if events.send(wrap(seq)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        tracing::info!(seq, interval_ms = period.as_millis() as u64, "log polling enabled");
        true
    }

    pub fn accept(&self, seq: u64) -> bool {
        self.task.is_some() && seq == self.seq
    }

    pub fn is_enabled(&self) -> bool {
        self.task.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poll = PollLoop::new(DEFAULT_POLL_INTERVAL);
        let start = Instant::now();

        assert!(poll.set_enabled(true, &tx, |seq| seq));
        assert!(!poll.set_enabled(true, &tx, |seq| seq));

        let first = rx.recv().await.unwrap();
        assert!(poll.accept(first));
        assert!(Instant::now() - start < Duration::from_millis(5));

        let second = rx.recv().await.unwrap();
        assert_eq!(second, first);
        assert!(Instant::now() - start >= DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_stops_scheduling_and_refuses_queued_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut poll = PollLoop::new(Duration::from_millis(100));

        poll.set_enabled(true, &tx, |seq| seq);
        let tick = rx.recv().await.unwrap();
        assert!(poll.set_enabled(false, &tx, |seq| seq));
        assert!(!poll.set_enabled(false, &tx, |seq| seq));
        assert!(!poll.accept(tick));

        assert!(timeout(Duration::from_secs(1), rx.recv()).await.is_err());

        poll.set_enabled(true, &tx, |seq| seq);
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick, 2);
        assert!(poll.accept(tick));
        assert!(!poll.accept(1));
    }
}
