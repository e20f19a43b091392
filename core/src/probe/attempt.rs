//! Run-time record of a single registration attempt.
//!
//! Every transition goes through one `watch` channel, so notifications
//! racing each other (or racing the timeout) are serialised by the channel
//! lock and only one outcome can ever be read back as final.

use std::sync::Arc;
use std::time::Duration;

use gkprobe_common::outcome::Outcome;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Lifecycle of an attempt. `Resolved` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    TransportConfiguring,
    TransportReady,
    RegistrationPending,
    Resolved(Outcome),
}

impl Phase {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Phase::Resolved(_))
    }
}

#[derive(Debug)]
struct AttemptState {
    phase: Phase,
    started_at: Option<Instant>,
    resolved_at: Option<Instant>,
    /// Set once the caller has taken the final outcome. Nothing changes after that.
    sealed: bool,
}

/// The final outcome of an attempt and how long it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    state: Arc<watch::Sender<AttemptState>>,
}

impl ProbeAttempt {
    pub fn new() -> Self {
        let state: AttemptState = AttemptState {
            phase: Phase::Idle,
            started_at: None,
            resolved_at: None,
            sealed: false,
        };
        Self {
            state: Arc::new(watch::Sender::new(state)),
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase.clone()
    }

    /// Handle for providers to deliver notifications from any task or thread.
    pub fn events(&self) -> EventSink {
        EventSink {
            state: self.state.clone(),
        }
    }

    /// Moves to a non-terminal phase. Ignored once resolved.
    pub(crate) fn enter(&self, phase: Phase) {
        self.state.send_if_modified(|state| {
            if state.sealed || state.phase.is_resolved() {
                return false;
            }
            state.phase = phase;
            true
        });
    }

    /// Records the start timestamp and moves to `RegistrationPending`.
    pub(crate) fn start(&self) {
        self.state.send_if_modified(|state| {
            if state.sealed || state.phase.is_resolved() {
                return false;
            }
            state.started_at = Some(Instant::now());
            state.phase = Phase::RegistrationPending;
            true
        });
    }

    pub(crate) fn commit(&self, outcome: Outcome) -> bool {
        commit(&self.state, outcome)
    }

    /// Waits until the attempt resolves or `deadline` passes.
    ///
    /// Returns `false` when the deadline passed first.
    pub(crate) async fn wait_until(&self, deadline: Instant) -> bool {
        let mut receiver: watch::Receiver<AttemptState> = self.state.subscribe();
        let resolved = tokio::time::timeout_at(
            deadline,
            receiver.wait_for(|state| state.phase.is_resolved()),
        )
        .await;
        matches!(resolved, Ok(Ok(_)))
    }

    /// Freezes the attempt and returns its final outcome.
    ///
    /// `fallback` is committed first if nothing resolved the attempt.
    pub(crate) fn seal(&self, fallback: Outcome) -> Resolution {
        commit(&self.state, fallback.clone());

        let mut resolution: Option<Resolution> = None;
        self.state.send_if_modified(|state| {
            state.sealed = true;
            if let Phase::Resolved(outcome) = &state.phase {
                let elapsed: Duration = match (state.started_at, state.resolved_at) {
                    (Some(started), Some(resolved)) => resolved
                        .checked_duration_since(started)
                        .unwrap_or(Duration::ZERO),
                    _ => Duration::ZERO,
                };
                resolution = Some(Resolution {
                    outcome: outcome.clone(),
                    elapsed,
                });
            }
            false
        });

        resolution.unwrap_or(Resolution {
            outcome: fallback,
            elapsed: Duration::ZERO,
        })
    }
}

impl Default for ProbeAttempt {
    fn default() -> Self {
        Self::new()
    }
}

/// Secure channel failure strictly dominates any healthy outcome that has
/// not been sealed yet.
fn dominates(new: &Outcome, current: &Outcome) -> bool {
    *new == Outcome::SecureChannelFailed && current.is_healthy()
}

fn commit(state: &watch::Sender<AttemptState>, outcome: Outcome) -> bool {
    let mut replaced: Option<Outcome> = None;
    let committed: bool = state.send_if_modified(|state| {
        if state.sealed {
            return false;
        }
        if let Phase::Resolved(current) = &state.phase {
            if !dominates(&outcome, current) {
                return false;
            }
            replaced = Some(current.clone());
        }
        state.phase = Phase::Resolved(outcome.clone());
        state.resolved_at = Some(Instant::now());
        true
    });

    match (committed, replaced) {
        (true, Some(previous)) => warn!("{outcome:?} overrides earlier {previous:?}"),
        (true, None) => info!("Attempt resolved: {outcome:?}"),
        (false, _) => debug!("Ignoring late notification: {outcome:?}"),
    }
    committed
}

/// Notifications raised by the transport and signaling providers.
///
/// Cheap to clone, safe to use from any thread. Every terminal notification
/// commits through the same set-once cell; the first one wins.
#[derive(Debug, Clone)]
pub struct EventSink {
    state: Arc<watch::Sender<AttemptState>>,
}

impl EventSink {
    pub fn on_secure_channel(&self, is_secured: bool) {
        if is_secured {
            debug!("Secure signalling channel established");
        } else {
            commit(&self.state, Outcome::SecureChannelFailed);
        }
    }

    pub fn on_gatekeeper_confirm(&self) {
        commit(&self.state, Outcome::GatekeeperConfirmed);
    }

    pub fn on_gatekeeper_reject(&self) {
        commit(&self.state, Outcome::GatekeeperRejected);
    }

    pub fn on_registration_reject(&self) {
        commit(&self.state, Outcome::RegistrationRejected);
    }

    pub fn on_registered(&self) {
        commit(&self.state, Outcome::Registered);
    }

    pub fn on_registration_failed(&self, reason: impl Into<String>) {
        commit(&self.state, Outcome::RegistrationFailed(reason.into()));
    }

    /// `true` once the attempt has an outcome; providers may stop early.
    pub fn is_resolved(&self) -> bool {
        self.state.borrow().phase.is_resolved()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
