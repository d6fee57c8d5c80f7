use crate::domain::event::{ChannelEvent, EventName};
use crate::domain::poll::{PollResult, ProcessingStep};
use crate::domain::state::Input;
use crate::error::{FinalizationError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum InputKind {
    Event,
    Poll,
    Failure,
}

/// One row of a recorded input log.
///
/// `name` and `pid` describe events; `pid`, `receipt` and
/// `processing_step` describe status reads.
#[derive(Debug, Deserialize)]
struct InputRecord {
    kind: InputKind,
    name: Option<String>,
    pid: Option<String>,
    receipt: Option<bool>,
    processing_step: Option<ProcessingStep>,
}

impl TryFrom<InputRecord> for Input {
    type Error = FinalizationError;

    fn try_from(record: InputRecord) -> Result<Self> {
        match record.kind {
            InputKind::Failure => Ok(Input::InitialFailure),
            InputKind::Poll => Ok(Input::Poll(PollResult {
                receipt_done: record.receipt.unwrap_or(false),
                participant_id: record.pid,
                processing_step: record.processing_step,
            })),
            InputKind::Event => {
                let name = record
                    .name
                    .ok_or_else(|| FinalizationError::InvalidInput("event row without name".into()))?
                    .parse::<EventName>()
                    .map_err(FinalizationError::InvalidInput)?;
                let payload = record.pid.map(|pid| serde_json::json!({ "pid": pid }));
                Ok(Input::Event(ChannelEvent::from_parts(name, payload.as_ref())?))
            }
        }
    }
}

/// Reads recorded finalization inputs from a CSV source.
///
/// Columns are `kind, name, pid, receipt, processing_step`; surrounding
/// whitespace is trimmed and trailing empty columns may be omitted.
pub struct InputReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InputReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one input per row, in file order.
    pub fn inputs(self) -> impl Iterator<Item = Result<Input>> {
        self.reader
            .into_deserialize::<InputRecord>()
            .map(|record| -> Result<Input> { Input::try_from(record?) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "kind, name, pid, receipt, processing_step\n";

    fn read(rows: &str) -> Vec<Result<Input>> {
        let data = format!("{HEADER}{rows}");
        InputReader::new(data.as_bytes()).inputs().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "event, generating_receipt, , ,\n\
             event, pid_generated, INC-4821, ,\n\
             poll, , , true, GENERATING_PID\n\
             failure, , , ,",
        );

        assert_eq!(results.len(), 4);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Input::Event(ChannelEvent::GeneratingReceipt)
        );
        assert_eq!(
            results[1].as_ref().unwrap(),
            &Input::Event(ChannelEvent::pid_generated("INC-4821"))
        );
        assert_eq!(
            results[2].as_ref().unwrap(),
            &Input::Poll(PollResult {
                receipt_done: true,
                participant_id: None,
                processing_step: Some(ProcessingStep::GeneratingPid),
            })
        );
        assert_eq!(results[3].as_ref().unwrap(), &Input::InitialFailure);
    }

    #[test]
    fn test_reader_short_rows() {
        let results = read("event, receipt_failed\n");
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Input::Event(ChannelEvent::ReceiptFailed)
        );
    }

    #[test]
    fn test_reader_malformed_lines() {
        let results = read(
            "event, quiz_started, , ,\n\
             event, pid_generated, , ,\n\
             unknown, , , ,\n\
             event, , , ,",
        );

        assert!(matches!(results[0], Err(FinalizationError::InvalidInput(_))));
        assert!(matches!(results[1], Err(FinalizationError::Protocol(_))));
        assert!(matches!(results[2], Err(FinalizationError::Csv(_))));
        assert!(matches!(results[3], Err(FinalizationError::InvalidInput(_))));
    }
}
