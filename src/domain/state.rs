use super::event::ChannelEvent;
use super::poll::{PollResult, ProcessingStep};
use super::stage::{Stage, StepStatus, Steps};
use serde::Serialize;
use thiserror::Error;

/// Inputs that contradict what the snapshot has already accepted.
///
/// A violation leaves the snapshot untouched; the caller reports it.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum ProtocolViolation {
    #[error("participant id already accepted as '{accepted}', rejected '{rejected}'")]
    ConflictingParticipantId { accepted: String, rejected: String },
    #[error("pid_generated carried no participant id")]
    MissingParticipantId,
}

/// Everything that can move the snapshot.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Input {
    Event(ChannelEvent),
    Poll(PollResult),
    InitialFailure,
}

impl From<ChannelEvent> for Input {
    fn from(event: ChannelEvent) -> Self {
        Input::Event(event)
    }
}

impl From<PollResult> for Input {
    fn from(result: PollResult) -> Self {
        Input::Poll(result)
    }
}

/// What is known about the pipeline when the view opens.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Seed {
    #[default]
    Fresh,
    PaymentConfirmed,
    Failed,
}

/// Canonical snapshot of a registration's finalization progress.
///
/// Built only through [`RegistrationFinalizationState::apply`], which keeps
/// the following true at all times:
///
/// * `participant_id` is set exactly when `steps.pid` is `success`.
/// * No step moves backwards in the [`StepStatus`] order.
/// * An `error` on any step means every step is `error`.
/// * Applying the same input twice equals applying it once.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFinalizationState {
    steps: Steps,
    participant_id: Option<String>,
}

impl RegistrationFinalizationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for a view opened right after a confirmed payment.
    pub fn payment_confirmed() -> Self {
        Self {
            steps: Steps::new(StepStatus::Success, StepStatus::Pending, StepStatus::Pending),
            participant_id: None,
        }
    }

    /// Snapshot for a view opened on an already failed registration.
    pub fn failed() -> Self {
        let mut state = Self::default();
        state.fail();
        state
    }

    pub fn seeded(seed: Seed) -> Self {
        match seed {
            Seed::Fresh => Self::new(),
            Seed::PaymentConfirmed => Self::payment_confirmed(),
            Seed::Failed => Self::failed(),
        }
    }

    pub fn steps(&self) -> &Steps {
        &self.steps
    }

    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.steps.any_error()
    }

    /// Nothing short of a failure can change a terminal snapshot's outcome.
    pub fn is_terminal(&self) -> bool {
        self.is_failed() || self.steps.pid == StepStatus::Success
    }

    /// Returns the snapshot that results from applying `input`.
    ///
    /// This is a pure function of `self` and `input`; on a protocol
    /// violation the input is rejected as a whole and `self` stays valid.
    pub fn apply(&self, input: &Input) -> Result<Self, ProtocolViolation> {
        let mut next = self.clone();
        match input {
            Input::InitialFailure => next.fail(),
            Input::Event(event) => next.apply_event(event)?,
            Input::Poll(result) => next.apply_poll(result)?,
        }
        next.normalize();
        Ok(next)
    }

    fn apply_event(&mut self, event: &ChannelEvent) -> Result<(), ProtocolViolation> {
        match event {
            ChannelEvent::GeneratingReceipt => {
                self.advance_past_payment();
                self.steps.raise(Stage::Receipt, StepStatus::Loading);
            }
            ChannelEvent::ReceiptGenerated => {
                self.advance_past_payment();
                self.steps.raise(Stage::Receipt, StepStatus::Success);
            }
            ChannelEvent::ReceiptFailed => {
                self.advance_past_payment();
                self.steps.raise(Stage::Receipt, StepStatus::Skipped);
            }
            ChannelEvent::GeneratingPid => {
                self.advance_past_payment();
                self.steps.raise(Stage::Pid, StepStatus::Loading);
            }
            ChannelEvent::PidGenerated { pid } => {
                self.accept_participant_id(pid)?;
                self.advance_past_payment();
                self.steps.raise(Stage::Pid, StepStatus::Success);
            }
            ChannelEvent::PaymentFailed => self.fail(),
        }
        Ok(())
    }

    fn apply_poll(&mut self, result: &PollResult) -> Result<(), ProtocolViolation> {
        if let Some(pid) = result.participant_id() {
            self.accept_participant_id(pid)?;
            for stage in Stage::ALL {
                self.steps.raise(stage, StepStatus::Success);
            }
        } else if result.receipt_done {
            self.steps.raise(Stage::Payment, StepStatus::Success);
            self.steps.raise(Stage::Receipt, StepStatus::Success);
        } else {
            match result.processing_step {
                Some(ProcessingStep::GeneratingPid) => {
                    self.steps.raise(Stage::Payment, StepStatus::Success);
                    self.steps.raise(Stage::Receipt, StepStatus::Success);
                    self.steps.raise(Stage::Pid, StepStatus::Loading);
                }
                Some(ProcessingStep::GeneratingReceipt) => {
                    self.steps.raise(Stage::Payment, StepStatus::Success);
                    self.steps.raise(Stage::Receipt, StepStatus::Loading);
                }
                None => {}
            }
        }
        Ok(())
    }

    fn accept_participant_id(&mut self, pid: &str) -> Result<(), ProtocolViolation> {
        let pid = pid.trim();
        if pid.is_empty() {
            return Err(ProtocolViolation::MissingParticipantId);
        }
        match &self.participant_id {
            Some(accepted) if accepted != pid => Err(ProtocolViolation::ConflictingParticipantId {
                accepted: accepted.clone(),
                rejected: pid.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.participant_id = Some(pid.to_string());
                Ok(())
            }
        }
    }

    // Receipt and pid work only starts after the payment was captured.
    fn advance_past_payment(&mut self) {
        self.steps.raise(Stage::Payment, StepStatus::Success);
    }

    fn fail(&mut self) {
        for stage in Stage::ALL {
            self.steps.raise(stage, StepStatus::Error);
        }
    }

    fn normalize(&mut self) {
        if self.steps.any_error() {
            self.fail();
            self.participant_id = None;
        }
    }
}
