use crate::domain::event::ChannelEvent;
use crate::domain::state::{Input, ProtocolViolation, RegistrationFinalizationState, Seed};
use crate::error::{FinalizationError, Result};
use std::fmt;
use tracing::{debug, error, info};

/// Why a snapshot ended up failed. Kept beside the snapshot, not in it, so
/// the snapshot stays independent of arrival order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FailureKind {
    /// `payment_failed`, a rejected verification or a known-failed seed.
    PipelineFailed,
    /// The verification call itself could not be completed.
    VerificationRequestFailed,
    /// The checkout was dismissed and the backend reported nothing.
    Stalled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::PipelineFailed => f.write_str("pipeline failed"),
            FailureKind::VerificationRequestFailed => f.write_str("verification request failed"),
            FailureKind::Stalled => f.write_str("stalled"),
        }
    }
}

/// Owns the live snapshot for one finalization view.
///
/// Every input goes through [`RegistrationFinalizationState::apply`]; the
/// reconciler adds bookkeeping the pure rule cannot hold: the failure cause
/// and the protocol violations seen so far.
#[derive(Debug, Default)]
pub struct Reconciler {
    state: RegistrationFinalizationState,
    failure: Option<FailureKind>,
    violations: Vec<ProtocolViolation>,
}

impl Reconciler {
    pub fn new(seed: Seed) -> Self {
        let state = RegistrationFinalizationState::seeded(seed);
        let failure = state.is_failed().then_some(FailureKind::PipelineFailed);
        Self {
            state,
            failure,
            violations: Vec::new(),
        }
    }

    pub fn state(&self) -> &RegistrationFinalizationState {
        &self.state
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn violations(&self) -> &[ProtocolViolation] {
        &self.violations
    }

    /// Applies one input. Returns whether the snapshot changed.
    ///
    /// A protocol violation is recorded, logged and returned; the snapshot
    /// keeps what it had already accepted.
    pub fn apply(&mut self, input: &Input) -> Result<bool> {
        let next = match self.state.apply(input) {
            Ok(next) => next,
            Err(violation) => {
                self.report(violation.clone());
                return Err(FinalizationError::Protocol(violation));
            }
        };

        if next == self.state {
            debug!(?input, "input carried no new progress");
            return Ok(false);
        }

        debug!(?input, steps = ?next.steps(), "snapshot advanced");
        if next.is_failed() && self.failure.is_none() {
            self.failure = Some(FailureKind::PipelineFailed);
        }
        if next.is_terminal() && !self.state.is_terminal() {
            match next.participant_id() {
                Some(pid) => info!(participant_id = pid, "participant id issued"),
                None => info!(cause = ?self.failure, "registration finalization failed"),
            }
        }
        self.state = next;
        Ok(true)
    }

    pub fn apply_event(&mut self, event: ChannelEvent) -> Result<bool> {
        self.apply(&Input::Event(event))
    }

    /// Forces the snapshot into failure for a cause detected outside the
    /// push channel. An earlier cause is kept.
    pub fn fail(&mut self, kind: FailureKind) -> bool {
        if self.state.is_failed() {
            return false;
        }
        self.failure = Some(kind);
        // A failure input cannot conflict with anything already accepted.
        self.apply(&Input::Event(ChannelEvent::PaymentFailed))
            .unwrap_or(false)
    }

    /// Records a violation detected before the input reached the reconciler.
    pub fn report(&mut self, violation: ProtocolViolation) {
        error!(%violation, "protocol violation on finalization channel");
        self.violations.push(violation);
    }
}
