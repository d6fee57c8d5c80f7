use crate::domain::stage::{Stage, StepStatus, Steps};
use crate::domain::state::RegistrationFinalizationState;
use std::fmt;

/// What the finalization view shows for a snapshot. Holds no logic beyond
/// picking the branch the snapshot dictates.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Reveal {
    Identifier(String),
    Failure { refund_window: String },
    Progress(Steps),
}

impl Reveal {
    pub fn from_state(state: &RegistrationFinalizationState, refund_window: &str) -> Self {
        if state.is_failed() {
            return Reveal::Failure {
                refund_window: refund_window.to_string(),
            };
        }
        match (state.steps().pid, state.participant_id()) {
            (StepStatus::Success, Some(pid)) => Reveal::Identifier(pid.to_string()),
            _ => Reveal::Progress(*state.steps()),
        }
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Payment => "Payment",
        Stage::Receipt => "Receipt",
        Stage::Pid => "Participant ID",
    }
}

impl fmt::Display for Reveal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reveal::Identifier(pid) => write!(f, "Registration complete. Participant ID: {pid}"),
            Reveal::Failure { refund_window } => write!(
                f,
                "Registration failed. Any amount debited will be refunded within {refund_window}."
            ),
            Reveal::Progress(steps) => {
                let mut first = true;
                for (stage, status) in steps.iter() {
                    if !first {
                        writeln!(f)?;
                    }
                    first = false;
                    write!(f, "{:<15} {status}", stage_label(stage))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::ChannelEvent;
    use crate::domain::state::Input;

    #[test]
    fn test_reveal_identifier() {
        let state = RegistrationFinalizationState::new()
            .apply(&Input::Event(ChannelEvent::pid_generated("INC-4821")))
            .unwrap();
        let reveal = Reveal::from_state(&state, "5 days");
        assert_eq!(reveal, Reveal::Identifier("INC-4821".to_string()));
        assert!(reveal.to_string().ends_with("INC-4821"));
    }

    #[test]
    fn test_reveal_failure_notice() {
        let reveal = Reveal::from_state(&RegistrationFinalizationState::failed(), "5 days");
        assert_eq!(
            reveal.to_string(),
            "Registration failed. Any amount debited will be refunded within 5 days."
        );
    }

    #[test]
    fn test_reveal_progress() {
        let state = RegistrationFinalizationState::payment_confirmed()
            .apply(&Input::Event(ChannelEvent::GeneratingReceipt))
            .unwrap();
        let text = Reveal::from_state(&state, "5 days").to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Payment") && lines[0].ends_with("success"));
        assert!(lines[1].starts_with("Receipt") && lines[1].ends_with("loading"));
        assert!(lines[2].starts_with("Participant ID") && lines[2].ends_with("pending"));
    }
}
