use crate::config::FinalizationConfig;
use crate::domain::poll::PollResult;
use crate::domain::ports::StatusSourceBox;
use crate::error::{FinalizationError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Reads the pipeline status from the pull endpoint.
///
/// Reads are idempotent, so retrying is always safe. A failed read never
/// says anything about the pipeline itself.
pub struct StatusPollResolver {
    source: StatusSourceBox,
    attempts: u32,
    backoff: Duration,
}

impl StatusPollResolver {
    pub fn new(source: StatusSourceBox, config: &FinalizationConfig) -> Self {
        Self {
            source,
            attempts: config.poll_attempts.max(1),
            backoff: config.poll_backoff,
        }
    }

    /// Single read of the status endpoint.
    pub async fn fetch_status(&self) -> Result<PollResult> {
        let result = self.source.fetch_status().await?;
        debug!(?result, "status read");
        Ok(result)
    }

    /// Reads until one attempt succeeds, backing off linearly in between.
    pub async fn fetch_with_retry(&self) -> Result<PollResult> {
        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match self.fetch_status().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(attempt, attempts = self.attempts, error = %e, "status read failed");
                    last_error = Some(e);
                }
            }
            if attempt < self.attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }
        Err(FinalizationError::StatusUnavailable(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }
}
