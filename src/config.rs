use clap::Args;
use std::time::Duration;

/// Runtime knobs of a finalization session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizationConfig {
    /// Reads attempted per status poll before reporting the endpoint unavailable.
    pub poll_attempts: u32,
    /// Delay between poll attempts, multiplied by the attempt number.
    pub poll_backoff: Duration,
    /// Upper bound on how long a session waits for a terminal snapshot.
    pub settle_timeout: Duration,
    /// Refund window quoted by the failure notice.
    pub refund_window: String,
}

impl Default for FinalizationConfig {
    fn default() -> Self {
        Self {
            poll_attempts: 3,
            poll_backoff: Duration::from_millis(500),
            settle_timeout: Duration::from_secs(120),
            refund_window: "5-7 business days".to_string(),
        }
    }
}

/// Command-line and environment form of [`FinalizationConfig`].
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Status reads attempted before giving up on a poll
    #[arg(long, env = "REGFINAL_POLL_ATTEMPTS", default_value_t = 3, global = true)]
    pub poll_attempts: u32,

    /// Backoff step between status reads, in milliseconds
    #[arg(long, env = "REGFINAL_POLL_BACKOFF_MS", default_value_t = 500, global = true)]
    pub poll_backoff_ms: u64,

    /// Seconds to wait for a terminal state
    #[arg(long, env = "REGFINAL_SETTLE_TIMEOUT_SECS", default_value_t = 120, global = true)]
    pub settle_timeout_secs: u64,

    /// Refund window shown when the pipeline fails
    #[arg(long, env = "REGFINAL_REFUND_WINDOW", default_value = "5-7 business days", global = true)]
    pub refund_window: String,
}

impl From<ConfigArgs> for FinalizationConfig {
    fn from(args: ConfigArgs) -> Self {
        Self {
            poll_attempts: args.poll_attempts.max(1),
            poll_backoff: Duration::from_millis(args.poll_backoff_ms),
            settle_timeout: Duration::from_secs(args.settle_timeout_secs),
            refund_window: args.refund_window,
        }
    }
}
