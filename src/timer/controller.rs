use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use log::{debug, info};
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::audio::{play_cues, AlertSink};

use super::{TimerConfig, TimerSnapshot, TimerState, TimerStatus};

/// The running tick task. Dropping it stops the task, so every path that
/// clears the slot (pause, reset, shutdown, last controller dropped) also
/// releases the driver.
struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    alerts: Arc<dyn AlertSink>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    updates: Arc<watch::Sender<TimerSnapshot>>,
    tick_interval: Duration,
}

impl TimerController {
    pub fn new(config: TimerConfig, alerts: Arc<dyn AlertSink>) -> Result<Self> {
        let state = TimerState::new(config)?;
        let (updates, _) = watch::channel(state.snapshot());

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            alerts,
            ticker: Arc::new(Mutex::new(None)),
            updates: Arc::new(updates),
            tick_interval: Duration::from_secs(1),
        })
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Receives a fresh snapshot after every tick and command.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.updates.subscribe()
    }

    pub async fn start(&self) -> TimerSnapshot {
        let mut ticker_guard = self.ticker.lock().await;
        let mut state = self.state.lock().await;

        let was_idle = state.status == TimerStatus::Idle;
        if !state.start() {
            return state.snapshot();
        }
        if was_idle {
            info!(
                "session {} started: {} rounds ({} box), {}s work / {}s rest",
                state.session_id.as_deref().unwrap_or("-"),
                state.config().rounds,
                state.config().box_rounds,
                state.config().work_secs,
                state.config().rest_secs,
            );
        } else {
            info!("resumed at round {} ({})", state.round, state.snapshot().clock);
        }

        *ticker_guard = Some(self.spawn_ticker());
        self.publish(state.snapshot())
    }

    pub async fn pause(&self) -> TimerSnapshot {
        let mut ticker_guard = self.ticker.lock().await;
        let mut state = self.state.lock().await;

        if state.pause() {
            info!("paused at round {} ({})", state.round, state.snapshot().clock);
        }
        drop(ticker_guard.take());
        self.publish(state.snapshot())
    }

    pub async fn reset(&self) -> TimerSnapshot {
        let mut ticker_guard = self.ticker.lock().await;
        let mut state = self.state.lock().await;

        if let Some(id) = state.session_id.as_deref() {
            info!("session {id} reset");
        }
        state.reset();
        drop(ticker_guard.take());
        self.alerts.silence();
        self.publish(state.snapshot())
    }

    /// Stops the driver for good, keeping the last state for display.
    pub async fn shutdown(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        let mut state = self.state.lock().await;

        state.pause();
        drop(ticker_guard.take());
        self.alerts.silence();
        self.publish(state.snapshot());
    }

    /// Whether a tick task is currently alive.
    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .is_some_and(Ticker::is_live)
    }

    /// Callers hold the state lock so a tick can't publish in between.
    fn publish(&self, snapshot: TimerSnapshot) -> TimerSnapshot {
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    fn spawn_ticker(&self) -> Ticker {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let state = self.state.clone();
        let alerts = self.alerts.clone();
        let updates = self.updates.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            // First tick lands one full period after start/resume
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        // Cues and the snapshot go out under the state lock, so a
                        // command that follows sees nothing from this tick after it
                        let mut guard = state.lock().await;
                        if token.is_cancelled() || !guard.is_running() {
                            break;
                        }
                        let before = (guard.round, guard.phase);
                        let cues = guard.tick();
                        if before != (guard.round, guard.phase) {
                            debug!(
                                "round {} {} -> round {} {}",
                                before.0,
                                before.1.as_str(),
                                guard.round,
                                guard.phase.as_str()
                            );
                        }

                        play_cues(alerts.as_ref(), &cues);

                        let snapshot = guard.snapshot();
                        let finished = snapshot.status == TimerStatus::Finished;
                        if finished {
                            let elapsed = snapshot
                                .started_at
                                .map(|at| (Utc::now() - at).num_seconds())
                                .unwrap_or_default();
                            info!(
                                "session {} complete: {} rounds in {}s",
                                snapshot.session_id.as_deref().unwrap_or("-"),
                                snapshot.total_rounds,
                                elapsed
                            );
                        }
                        updates.send_replace(snapshot);
                        drop(guard);
                        if finished {
                            break;
                        }
                    }
                }
            }
        });

        Ticker { handle, cancel }
    }
}
