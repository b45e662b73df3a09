//! Progress normalization across pipeline phases.
//!
//! The fetcher reports byte percentages and the transcoder reports frame
//! percentages. Both are funneled through a [`PhaseTracker`] so each request
//! produces one ordered stream: phases only advance, and percent never
//! decreases within a phase.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{ActiveRequest, Phase, ProgressEvent};

/// Observer invoked for every event of every request.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Per-request state the orchestrator keeps while a request is active.
pub(crate) struct ActiveEntry {
    pub(crate) info: ActiveRequest,
    pub(crate) cancel: CancellationToken,
}

pub(crate) type ActiveMap = Arc<RwLock<HashMap<String, ActiveEntry>>>;

/// Enforces phase ordering and per-phase monotonic percent.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    phase: Option<Phase>,
    percent: f32,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    /// Moves to `phase`, returning the percent to report on entry.
    ///
    /// Returns `None` if the move would go backwards or leave a terminal
    /// phase. `Failed` keeps the last percent, `Done` reports 100, and every
    /// other phase starts at 0.
    pub fn enter(&mut self, phase: Phase) -> Option<f32> {
        if let Some(current) = self.phase {
            if current.is_terminal() {
                return None;
            }
            if phase != Phase::Failed && phase <= current {
                return None;
            }
        }

        self.percent = match phase {
            Phase::Done => 100.0,
            Phase::Failed => self.percent,
            _ => 0.0,
        };
        self.phase = Some(phase);
        Some(self.percent)
    }

    /// Records a percent within the current phase.
    ///
    /// Returns the clamped value when it advances progress; stale,
    /// repeated, or non-finite values return `None`.
    pub fn update(&mut self, percent: f32) -> Option<f32> {
        match self.phase {
            Some(phase) if !phase.is_terminal() => {}
            _ => return None,
        }
        if !percent.is_finite() {
            return None;
        }

        let percent = percent.clamp(0.0, 100.0);
        if percent <= self.percent {
            return None;
        }
        self.percent = percent;
        Some(percent)
    }
}

/// Publishes one request's events to its channel, the optional observer
/// callback and the orchestrator's phase map.
pub(crate) struct ProgressEmitter {
    request_id: String,
    tracker: PhaseTracker,
    events_tx: mpsc::Sender<ProgressEvent>,
    callback: Option<ProgressCallback>,
    active: ActiveMap,
    cancel: CancellationToken,
}

impl ProgressEmitter {
    pub(crate) fn new(
        request_id: String,
        events_tx: mpsc::Sender<ProgressEvent>,
        callback: Option<ProgressCallback>,
        active: ActiveMap,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            request_id,
            tracker: PhaseTracker::new(),
            events_tx,
            callback,
            active,
            cancel,
        }
    }

    pub(crate) fn phase(&self) -> Option<Phase> {
        self.tracker.phase()
    }

    /// Enters a new phase.
    ///
    /// A terminal phase removes the request from the phase map after its
    /// event has been published.
    pub(crate) async fn enter(&mut self, phase: Phase) {
        let Some(percent) = self.tracker.enter(phase) else {
            debug!(request_id = %self.request_id, phase = %phase, "Ignoring out-of-order phase");
            return;
        };

        if !phase.is_terminal() {
            if let Some(entry) = self.active.write().await.get_mut(&self.request_id) {
                entry.info.phase = phase;
            }
        }

        self.publish(phase, percent, true).await;

        if phase.is_terminal() {
            self.active.write().await.remove(&self.request_id);
        }
    }

    /// Reports progress within the current phase.
    pub(crate) async fn update(&mut self, percent: f32) {
        if let Some(percent) = self.tracker.update(percent) {
            if let Some(phase) = self.tracker.phase() {
                self.publish(phase, percent, false).await;
            }
        }
    }

    async fn publish(&self, phase: Phase, percent: f32, transition: bool) {
        let event = ProgressEvent {
            request_id: self.request_id.clone(),
            phase,
            percent,
        };
        debug!(request_id = %self.request_id, phase = %phase, percent, "Progress");

        if let Some(callback) = &self.callback {
            callback(&event);
        }

        // Phase transitions wait for room in the channel until the request
        // is cancelled; in-phase updates are dropped when the receiver lags.
        let delivered = if transition {
            tokio::select! {
                biased;
                permit = self.events_tx.reserve() => match permit {
                    Ok(permit) => {
                        permit.send(event);
                        Ok(())
                    }
                    Err(_) => Err(TrySendError::Closed(event)),
                },
                _ = self.cancel.cancelled() => self.events_tx.try_send(event),
            }
        } else {
            self.events_tx.try_send(event)
        };

        match delivered {
            Ok(()) => {}
            Err(TrySendError::Closed(_)) => {
                if !phase.is_terminal() && !self.cancel.is_cancelled() {
                    info!(request_id = %self.request_id, "Progress receiver dropped, cancelling request");
                    self.cancel.cancel();
                }
            }
            Err(TrySendError::Full(_)) if transition => {
                warn!(request_id = %self.request_id, phase = %phase, "Progress channel full, dropped phase event");
            }
            Err(TrySendError::Full(_)) => {
                debug!(request_id = %self.request_id, percent, "Progress channel full, dropped update");
            }
        }
    }
}
