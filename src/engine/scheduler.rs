use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::engine::assignment::try_assign;
use crate::engine::reminders::send_reminders;
use crate::engine::window::assignment_window;
use crate::notify::Notifier;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

struct Inner {
    state: LoopState,
    shutdown_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

pub struct Scheduler {
    app: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<Inner>,
}

impl Scheduler {
    pub fn new(app: Arc<AppState>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            app,
            notifier,
            inner: Mutex::new(Inner {
                state: LoopState::Stopped,
                shutdown_tx: None,
                handle: None,
            }),
        }
    }

    pub async fn start(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == LoopState::Running {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.app.clone(),
            self.notifier.clone(),
            shutdown_rx,
        ));

        inner.shutdown_tx = Some(shutdown_tx);
        inner.handle = Some(handle);
        inner.state = LoopState::Running;
        info!("ride scheduler started");
    }

    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == LoopState::Stopped {
            return;
        }

        if let Some(shutdown_tx) = inner.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        // An in-flight cycle runs to completion before the task exits.
        if let Some(handle) = inner.handle.take() {
            if let Err(err) = handle.await {
                error!(error = %err, "scheduler task panicked");
            }
        }

        inner.state = LoopState::Stopped;
        info!("ride scheduler stopped");
    }

    pub async fn loop_state(&self) -> LoopState {
        self.inner.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.loop_state().await == LoopState::Running
    }
}

async fn run_loop(
    app: Arc<AppState>,
    notifier: Arc<dyn Notifier>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(app.config.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                run_cycle(&app, notifier.as_ref(), Utc::now()).await;
            }
        }
    }
}

pub async fn run_cycle(app: &AppState, notifier: &dyn Notifier, now: DateTime<Utc>) {
    let window = assignment_window(now, &app.config);

    for ride in app.rides.needing_assignment(&window) {
        let started = Instant::now();
        let ride_id = ride.id;

        match try_assign(app, notifier, &ride, now).await {
            Ok(outcome) => {
                let elapsed = started.elapsed().as_secs_f64();
                app.metrics
                    .assignment_latency_seconds
                    .with_label_values(&[outcome.label()])
                    .observe(elapsed);
                app.metrics
                    .assignments_total
                    .with_label_values(&[outcome.label()])
                    .inc();
            }
            Err(err) => {
                let elapsed = started.elapsed().as_secs_f64();
                app.metrics
                    .assignment_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                app.metrics
                    .assignments_total
                    .with_label_values(&["error"])
                    .inc();
                error!(ride_id = %ride_id, error = %err, "failed to process scheduled ride");
            }
        }
    }

    send_reminders(app, notifier, now).await;
    app.metrics.scheduler_cycles_total.inc();
}
