//! Progress indicator and simulated progress
//!
//! The percentage shown while a request is in flight is simulated: it has no
//! relation to server-side progress. The simulator runs as its own task and
//! stops the moment its `CancellationToken` fires, which the orchestrator
//! ties to request settlement.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Where the simulated ramp starts
pub const SIMULATED_START: u8 = 10;
/// The simulated ramp stays strictly below this value
pub const SIMULATED_CEILING: u8 = 90;
/// Shown once the response has been accepted, before decoding
pub const NEAR_COMPLETE: u8 = 95;
/// Shown once results are ready
pub const COMPLETE: u8 = 100;

/// Receives progress indicator changes (e.g. to update a progress bar)
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, percent: u8);
    fn on_hidden(&self);
}

/// Observer that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _percent: u8) {}
    fn on_hidden(&self) {}
}

/// Point-in-time view of the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub visible: bool,
}

#[derive(Debug, Default)]
struct IndicatorState {
    percent: u8,
    visible: bool,
    generation: u64,
}

/// Shared progress indicator
///
/// Cloning yields another handle to the same indicator.
#[derive(Clone)]
pub struct ProgressIndicator {
    state: Arc<Mutex<IndicatorState>>,
    observer: Arc<dyn ProgressObserver>,
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new(Arc::new(NoopProgress))
    }
}

impl std::fmt::Debug for ProgressIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressIndicator")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl ProgressIndicator {
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            state: Arc::new(Mutex::new(IndicatorState::default())),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndicatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Show the indicator for a new attempt; returns the attempt generation
    pub fn begin(&self) -> u64 {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.visible = true;
            state.percent = 0;
            state.generation
        };
        self.observer.on_progress(0);
        generation
    }

    /// Set the displayed percentage (clamped to 100)
    pub fn set(&self, percent: u8) {
        let percent = percent.min(COMPLETE);
        self.lock().percent = percent;
        self.observer.on_progress(percent);
    }

    /// Advance by one point if still below `ceiling - 1`
    ///
    /// Returns false once the ramp has flattened out.
    pub fn advance_below(&self, ceiling: u8) -> bool {
        let next = {
            let mut state = self.lock();
            if state.percent.saturating_add(1) >= ceiling {
                return false;
            }
            state.percent += 1;
            state.percent
        };
        self.observer.on_progress(next);
        true
    }

    pub fn hide(&self) {
        self.lock().visible = false;
        self.observer.on_hidden();
    }

    /// Hide after `delay`, unless a newer attempt has begun meanwhile
    pub fn hide_after(&self, delay: Duration) -> JoinHandle<()> {
        let generation = self.lock().generation;
        let indicator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let current = indicator.lock().generation;
            if current == generation {
                indicator.hide();
            } else {
                tracing::debug!(generation, current, "skipping stale progress hide");
            }
        })
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.lock();
        ProgressSnapshot {
            percent: state.percent,
            visible: state.visible,
        }
    }
}

/// Fixed-cadence simulated progress
#[derive(Debug, Clone, Copy)]
pub struct ProgressSimulator {
    tick: Duration,
}

impl ProgressSimulator {
    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }

    /// Start the ramp at `SIMULATED_START` and tick until cancelled
    pub fn spawn(&self, indicator: ProgressIndicator, cancel: CancellationToken) -> JoinHandle<()> {
        let tick = self.tick;
        indicator.set(SIMULATED_START);
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + tick, tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if indicator.advance_below(SIMULATED_CEILING) {
                            tracing::trace!(percent = indicator.snapshot().percent, "simulated progress");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        updates: Mutex<Vec<u8>>,
        hidden: Mutex<u32>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, percent: u8) {
            self.updates.lock().unwrap().push(percent);
        }
        fn on_hidden(&self) {
            *self.hidden.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_advance_never_reaches_ceiling() {
        let indicator = ProgressIndicator::default();
        indicator.begin();
        indicator.set(SIMULATED_START);
        while indicator.advance_below(SIMULATED_CEILING) {}
        assert_eq!(indicator.snapshot().percent, SIMULATED_CEILING - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulator_ticks_at_cadence_and_stops_on_cancel() {
        let recorder = Arc::new(Recorder::default());
        let indicator = ProgressIndicator::new(recorder.clone());
        indicator.begin();

        let cancel = CancellationToken::new();
        let handle = ProgressSimulator::new(Duration::from_millis(400))
            .spawn(indicator.clone(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(1_250)).await;
        assert_eq!(indicator.snapshot().percent, SIMULATED_START + 3);

        cancel.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(indicator.snapshot().percent, SIMULATED_START + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulator_caps_below_ninety() {
        let indicator = ProgressIndicator::default();
        indicator.begin();
        let cancel = CancellationToken::new();
        let handle = ProgressSimulator::new(Duration::from_millis(400))
            .spawn(indicator.clone(), cancel.clone());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(indicator.snapshot().percent, SIMULATED_CEILING - 1);
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_hide_is_skipped() {
        let recorder = Arc::new(Recorder::default());
        let indicator = ProgressIndicator::new(recorder.clone());
        indicator.begin();

        let stale = indicator.hide_after(Duration::from_secs(3));
        indicator.begin();
        stale.await.unwrap();

        assert!(indicator.snapshot().visible);
        assert_eq!(*recorder.hidden.lock().unwrap(), 0);

        indicator.hide_after(Duration::from_secs(3)).await.unwrap();
        assert!(!indicator.snapshot().visible);
    }
}
