//! Simulated progress for a generation call.
//!
//! The backend reports nothing until the images are done, so the bar is a
//! time-based estimate that stalls at 99% until [`ProgressEstimator::stop`]
//! or [`ProgressEstimator::cancel`] is called.

use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

use crate::config::ProgressConfig;
use crate::ui::Ui;

const CAP: f32 = 0.99;

#[derive(Default)]
struct ProgressState {
    running: bool,
    started: Option<Instant>,
    estimated: Duration,
    percent: u8,
    /// Bumped on every start and reset so a stale ticker stops touching the UI.
    run: u64,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressState {
    fn reset(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.running = false;
        self.started = None;
        self.percent = 0;
        self.run += 1;
    }
}

/// Fraction of the estimate that has elapsed, capped below completion.
pub fn progress_fraction(elapsed: Duration, estimated: Duration) -> f32 {
    if estimated.is_zero() {
        return CAP;
    }
    (elapsed.as_secs_f32() / estimated.as_secs_f32()).min(CAP)
}

#[derive(Clone)]
pub struct ProgressEstimator {
    state: Arc<Mutex<ProgressState>>,
    config: ProgressConfig,
    ui: Arc<dyn Ui>,
}

impl ProgressEstimator {
    pub fn new(config: ProgressConfig, ui: Arc<dyn Ui>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ProgressState::default())),
            config,
            ui,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// `base × (steps / 50) × √batch`. A heuristic, not a measurement.
    pub fn estimate(&self, batch_size: u32, step_count: u32) -> Duration {
        let seconds = self.config.base_seconds
            * (step_count as f32 / 50.0)
            * (batch_size.max(1) as f32).sqrt();
        Duration::try_from_secs_f32(seconds).unwrap_or(Duration::ZERO)
    }

    /// Starts ticking. Must be called from within a tokio runtime; a second
    /// call while running does nothing.
    pub fn start(&self, estimated: Duration) {
        let mut state = self.lock();
        if state.running {
            log::debug!("Progress already running, ignoring start");
            return;
        }

        state.running = true;
        state.started = Some(Instant::now());
        state.estimated = estimated;
        state.percent = 0;
        state.run += 1;
        let run = state.run;

        log::debug!("Estimated generation time: {:.1}s", estimated.as_secs_f32());
        self.ui.show_progress(0);

        let shared = Arc::clone(&self.state);
        let ui = Arc::clone(&self.ui);
        let mut interval = time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        state.ticker = Some(tokio::spawn(async move {
            let mut ticks = IntervalStream::new(interval);
            while ticks.next().await.is_some() {
                let percent = {
                    let mut state = match shared.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    if state.run != run || !state.running {
                        break;
                    }
                    let elapsed = state.started.map(|s| s.elapsed()).unwrap_or_default();
                    state.percent = (progress_fraction(elapsed, state.estimated) * 100.0) as u8;
                    state.percent
                };
                ui.show_progress(percent);
            }
        }));
    }

    /// Completion: snap to 100%, hold, then hide.
    pub async fn stop(&self) {
        let run = {
            let mut state = self.lock();
            if let Some(ticker) = state.ticker.take() {
                ticker.abort();
            }
            state.percent = 100;
            state.run
        };
        self.ui.show_progress(100);

        time::sleep(self.config.completion_hold).await;

        let mut state = self.lock();
        if state.run == run {
            state.reset();
            drop(state);
            self.ui.hide_progress();
        }
    }

    /// Failure: hide immediately, no completion flourish.
    pub fn cancel(&self) {
        self.lock().reset();
        self.ui.hide_progress();
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn percent(&self) -> u8 {
        self.lock().percent
    }
}
