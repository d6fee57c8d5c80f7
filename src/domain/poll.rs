use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Pipeline step the backend reports as currently running.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStep {
    GeneratingReceipt,
    GeneratingPid,
}

impl FromStr for ProcessingStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATING_RECEIPT" => Ok(ProcessingStep::GeneratingReceipt),
            "GENERATING_PID" => Ok(ProcessingStep::GeneratingPid),
            other => Err(format!("unknown processing step '{other}'")),
        }
    }
}

/// Result of a single read of the status endpoint.
///
/// Field names follow the pull endpoint's JSON body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    #[serde(rename = "receipt", default)]
    pub receipt_done: bool,
    #[serde(rename = "pid", default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub processing_step: Option<ProcessingStep>,
}

impl PollResult {
    pub fn completed(participant_id: impl Into<String>) -> Self {
        Self {
            receipt_done: true,
            participant_id: Some(participant_id.into()),
            processing_step: None,
        }
    }

    pub fn processing(step: ProcessingStep) -> Self {
        Self {
            processing_step: Some(step),
            ..Self::default()
        }
    }

    /// True when the read reports no progress at all.
    pub fn is_empty(&self) -> bool {
        !self.receipt_done && self.participant_id().is_none() && self.processing_step.is_none()
    }

    /// True when the backend reports an issued id or a running step.
    /// A completed receipt alone does not count: nothing is left running.
    pub fn shows_activity(&self) -> bool {
        self.participant_id().is_some() || self.processing_step.is_some()
    }

    /// Participant id with blank values treated as absent.
    pub fn participant_id(&self) -> Option<&str> {
        self.participant_id
            .as_deref()
            .map(str::trim)
            .filter(|pid| !pid.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_poll_result_from_endpoint_body() {
        let body = json!({ "receipt": true, "pid": "INC-7777", "processingStep": null });
        let result: PollResult = serde_json::from_value(body).unwrap();
        assert_eq!(result, PollResult::completed("INC-7777"));
    }

    #[test]
    fn test_poll_result_processing_step() {
        let body = json!({ "receipt": false, "pid": null, "processingStep": "GENERATING_PID" });
        let result: PollResult = serde_json::from_value(body).unwrap();
        assert_eq!(result.processing_step, Some(ProcessingStep::GeneratingPid));
        assert!(!result.is_empty());
    }

    #[test]
    fn test_empty_poll_result() {
        let result: PollResult = serde_json::from_value(json!({})).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.participant_id(), None);
    }

    #[test]
    fn test_receipt_alone_is_not_activity() {
        let result = PollResult {
            receipt_done: true,
            ..PollResult::default()
        };
        assert!(!result.is_empty());
        assert!(!result.shows_activity());
        assert!(PollResult::processing(ProcessingStep::GeneratingReceipt).shows_activity());
        assert!(PollResult::completed("INC-1").shows_activity());
    }

    #[test]
    fn test_blank_participant_id_is_absent() {
        let result = PollResult {
            participant_id: Some(" ".to_string()),
            ..PollResult::default()
        };
        assert_eq!(result.participant_id(), None);
    }
}
