//! Coalesced reload signal.
//!
//! [`ReloadSignal`] is the single logical channel between selection
//! mutations and the derived-list pipelines. It is a watch-backed tick
//! counter: late subscribers immediately observe the most recent tick
//! (so a freshly mounted pipeline runs its first evaluation without a
//! separate bootstrap), and a burst of rapid ticks is debounced into one
//! wakeup per listener.

use std::time::Duration;

use tokio::sync::watch;

/// Default settle window applied by the composed coordinator.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// The sender side is gone; the consuming pipeline should terminate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalClosed;

/// Replayable, coalesced trigger channel.
#[derive(Debug)]
pub struct ReloadSignal {
    tx: watch::Sender<u64>,
}

impl ReloadSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Record one tick. Listeners see at most one wakeup per settle window
    /// regardless of how many ticks land inside it.
    pub fn pulse(&self) {
        self.tx.send_modify(|tick| *tick = tick.wrapping_add(1));
    }

    /// Subscribe with the given settle window.
    ///
    /// The returned listener starts "dirty": its first [`settled`] call
    /// resolves even if no pulse arrives after subscription, replaying the
    /// latest tick to the late subscriber.
    ///
    /// [`settled`]: ReloadListener::settled
    pub fn subscribe(&self, settle: Duration) -> ReloadListener {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        ReloadListener { rx, settle }
    }
}

impl Default for ReloadSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a [`ReloadSignal`].
#[derive(Debug)]
pub struct ReloadListener {
    rx: watch::Receiver<u64>,
    settle: Duration,
}

impl ReloadListener {
    /// Wait for at least one tick, then keep absorbing ticks until the
    /// signal has been quiet for a full settle window.
    ///
    /// Returns once per burst. `Err(SignalClosed)` means the sender was
    /// dropped and no further tick can ever arrive.
    pub async fn settled(&mut self) -> Result<(), SignalClosed> {
        self.rx.changed().await.map_err(|_| SignalClosed)?;
        loop {
            match tokio::time::timeout(self.settle, self.rx.changed()).await {
                // Quiet for a full window: the burst has settled.
                Err(_) => return Ok(()),
                // Another tick landed inside the window; keep absorbing.
                Ok(Ok(())) => continue,
                // Sender gone mid-burst: deliver what we already absorbed;
                // the next call reports the closure.
                Ok(Err(_)) => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{advance, timeout};

    #[tokio::test(start_paused = true)]
    async fn burst_of_ticks_settles_once() {
        let signal = ReloadSignal::new();
        let mut listener = signal.subscribe(Duration::from_millis(100));
        // Drain the replayed initial tick.
        listener.settled().await.unwrap();

        for _ in 0..5 {
            signal.pulse();
            advance(Duration::from_millis(10)).await;
        }

        listener.settled().await.unwrap();
        // No further wakeup until a new pulse arrives.
        let idle = timeout(Duration::from_secs(1), listener.settled()).await;
        assert!(idle.is_err(), "listener woke without a new tick");
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscriber_replays_latest_tick() {
        let signal = ReloadSignal::new();
        signal.pulse();
        signal.pulse();

        let mut listener = signal.subscribe(Duration::from_millis(100));
        let woke = timeout(Duration::from_secs(1), listener.settled()).await;
        assert_eq!(woke, Ok(Ok(())));
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_ticks_settle_separately() {
        let signal = ReloadSignal::new();
        let mut listener = signal.subscribe(Duration::from_millis(100));
        listener.settled().await.unwrap();

        signal.pulse();
        listener.settled().await.unwrap();
        advance(Duration::from_millis(500)).await;
        signal.pulse();
        listener.settled().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_reports_closed() {
        let signal = ReloadSignal::new();
        let mut listener = signal.subscribe(Duration::from_millis(100));
        listener.settled().await.unwrap();

        drop(signal);
        assert_eq!(listener.settled().await, Err(SignalClosed));
    }
}
