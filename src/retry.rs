//! Per-message destructive action with classified retries
//!
//! Every attempt is reduced to an [`AttemptOutcome`] before the retry loop
//! looks at it:
//! - `Success`: stop, the message is done;
//! - `Transient`: status in the transient set, back off and retry;
//! - `Permanent`: any other status, log and skip the message;
//! - `Fault`: no status at all (network, IO, unexpected), back off and retry.
//!
//! Unknown faults are retried rather than skipped. Only status-bearing errors
//! are ever judged permanent.

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::client::GmailClient;
use crate::config::RetryConfig;
use crate::error::{GmailError, Result};
use crate::models::{ActionOutcome, Mode};

/// The mutating call applied to each message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructiveAction {
    Trash,
    Delete,
}

impl DestructiveAction {
    /// `None` for preview, which never mutates
    pub fn for_mode(mode: Mode) -> Option<Self> {
        match mode {
            Mode::Preview => None,
            Mode::MoveToTrash => Some(DestructiveAction::Trash),
            Mode::PermanentDelete => Some(DestructiveAction::Delete),
        }
    }

    async fn apply<C: GmailClient + ?Sized>(&self, client: &C, id: &str) -> Result<()> {
        match self {
            DestructiveAction::Trash => client.trash_message(id).await,
            DestructiveAction::Delete => client.delete_message(id).await,
        }
    }
}

/// Classified result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    Success,
    Transient { status: u16 },
    Permanent { status: u16, error: GmailError },
    Fault(GmailError),
}

/// Retry limits and classification for destructive actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub transient_statuses: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_secs(config.base_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            transient_statuses: config.transient_status_codes.iter().copied().collect(),
        }
    }

    /// `min(max_delay, base_delay * 2^attempt)`, attempt counted from 0
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    pub fn classify(&self, result: Result<()>) -> AttemptOutcome {
        match result {
            Ok(()) => AttemptOutcome::Success,
            Err(error) => match error.status_code() {
                Some(status) if self.transient_statuses.contains(&status) => {
                    AttemptOutcome::Transient { status }
                }
                Some(status) => AttemptOutcome::Permanent { status, error },
                None => AttemptOutcome::Fault(error),
            },
        }
    }
}

/// Applies one destructive action to one message under a [`RetryPolicy`]
#[derive(Debug, Clone, Default)]
pub struct RetryingActuator {
    policy: RetryPolicy,
}

impl RetryingActuator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Never returns an error: every failure ends as `SkippedPermanent`.
    ///
    /// The backoff sleep also follows the last failed attempt, which keeps a
    /// rate-limited account from being hit again straight away by the next
    /// message.
    pub async fn execute<C: GmailClient + ?Sized>(
        &self,
        client: &C,
        id: &str,
        action: DestructiveAction,
    ) -> ActionOutcome {
        for attempt in 0..self.policy.max_attempts {
            let delay = self.policy.backoff_delay(attempt);

            match self.policy.classify(action.apply(client, id).await) {
                AttemptOutcome::Success => {
                    debug!(message_id = %id, attempt, ?action, "Action succeeded");
                    return ActionOutcome::Succeeded;
                }
                AttemptOutcome::Transient { status } => {
                    debug!(
                        message_id = %id,
                        attempt,
                        status,
                        "Transient error, retrying in {:?}",
                        delay
                    );
                }
                AttemptOutcome::Permanent { status, error } => {
                    warn!(
                        message_id = %id,
                        status,
                        error = %error,
                        "[SKIP] skipping message {} after permanent error: {}",
                        id,
                        error
                    );
                    return ActionOutcome::SkippedPermanent;
                }
                AttemptOutcome::Fault(error) => {
                    warn!(
                        message_id = %id,
                        attempt,
                        error = %error,
                        "Unexpected error, retrying in {:?}",
                        delay
                    );
                }
            }

            tokio::time::sleep(delay).await;
        }

        warn!(
            message_id = %id,
            attempts = self.policy.max_attempts,
            "[SKIP] skipping message {} after {} failed attempts",
            id,
            self.policy.max_attempts
        );
        ActionOutcome::SkippedPermanent
    }
}
