use crate::domain::stage::StepStatus;
use crate::domain::state::RegistrationFinalizationState;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct StateRow<'a> {
    payment: StepStatus,
    receipt: StepStatus,
    pid: StepStatus,
    participant_id: Option<&'a str>,
    failed: bool,
}

impl<'a> From<&'a RegistrationFinalizationState> for StateRow<'a> {
    fn from(state: &'a RegistrationFinalizationState) -> Self {
        let steps = state.steps();
        Self {
            payment: steps.payment,
            receipt: steps.receipt,
            pid: steps.pid,
            participant_id: state.participant_id(),
            failed: state.is_failed(),
        }
    }
}

/// Writes finalization snapshots as CSV, one row per snapshot.
pub struct StateWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StateWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_state(&mut self, state: &RegistrationFinalizationState) -> Result<()> {
        self.writer.serialize(StateRow::from(state))?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::ChannelEvent;
    use crate::domain::state::Input;

    fn render(state: &RegistrationFinalizationState) -> String {
        let mut buffer = Vec::new();
        StateWriter::new(&mut buffer).write_state(state).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_write_completed_state() {
        let state = RegistrationFinalizationState::payment_confirmed()
            .apply(&Input::Event(ChannelEvent::pid_generated("INC-4821")))
            .unwrap();
        assert_eq!(
            render(&state),
            "payment,receipt,pid,participant_id,failed\nsuccess,pending,success,INC-4821,false\n"
        );
    }

    #[test]
    fn test_write_failed_state() {
        let state = RegistrationFinalizationState::failed();
        assert_eq!(
            render(&state),
            "payment,receipt,pid,participant_id,failed\nerror,error,error,,true\n"
        );
    }
}
