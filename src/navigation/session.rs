//! Async driver for the navigation tracker
//!
//! A single spawned task owns the tracker and consumes fixes from a channel
//! one at a time, so tracker mutation is never concurrent and fixes are never
//! processed out of order. Events go out on an unbounded channel; the latest
//! state is published on a watch channel.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::events::NavEvent;
use super::state::{FixError, NavigationState, PositionFix};
use super::tracker::{NavigationTracker, TripPlan};

/// Item delivered by the position source
pub type FixResult = std::result::Result<PositionFix, FixError>;

pub struct NavigationSession {
    task: Option<JoinHandle<()>>,
    state_tx: Arc<watch::Sender<NavigationState>>,
}

impl NavigationSession {
    /// Start tracking `plan` with fixes from `fixes`
    ///
    /// The `TripStarted` event is the first item on the returned receiver.
    pub fn start(
        mut tracker: NavigationTracker,
        plan: TripPlan,
        fixes: mpsc::Receiver<FixResult>,
    ) -> (Self, mpsc::UnboundedReceiver<NavEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let started = tracker.start(plan);
        let _ = events_tx.send(started);

        let (state_tx, _) = watch::channel(tracker.state().clone());
        let state_tx = Arc::new(state_tx);
        let timeout = tracker
            .config()
            .fix_timeout_s
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64);

        let task = tokio::spawn(run(tracker, fixes, events_tx, Arc::clone(&state_tx), timeout));

        (
            Self {
                task: Some(task),
                state_tx,
            },
            events_rx,
        )
    }

    /// Latest tracker state
    pub fn state(&self) -> watch::Receiver<NavigationState> {
        self.state_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Abort the task and publish an idle state; idempotent
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Navigation session stopped");
        }
        self.state_tx.send_replace(NavigationState::default());
    }

    /// Wait for the position source to close
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    mut tracker: NavigationTracker,
    mut fixes: mpsc::Receiver<FixResult>,
    events: mpsc::UnboundedSender<NavEvent>,
    state: Arc<watch::Sender<NavigationState>>,
    timeout: Option<Duration>,
) {
    loop {
        let next = match timeout {
            Some(limit) => match tokio::time::timeout(limit, fixes.recv()).await {
                Ok(item) => item,
                Err(_) => Some(Err(FixError::Timeout {
                    after_s: limit.as_secs_f64(),
                })),
            },
            None => fixes.recv().await,
        };

        let Some(item) = next else {
            tracing::debug!("Position source closed");
            break;
        };

        let produced = match item {
            Ok(fix) => tracker.on_fix(fix),
            Err(error) => tracker.on_fix_error(error),
        };
        state.send_replace(tracker.state().clone());

        for event in produced {
            if events.send(event).is_err() {
                tracing::debug!("Event receiver dropped; ending session");
                return;
            }
        }
    }
}
