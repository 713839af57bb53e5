use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{GmailError, Result};

/// One page of a `messages.list` response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}

/// Label identifiers attached to a single message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLabels {
    pub id: String,
    pub label_ids: HashSet<String>,
}

/// What a run is allowed to do to the selected messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Count matches, change nothing
    Preview,
    /// Move matches to Trash (recoverable for 30 days)
    MoveToTrash,
    /// Delete matches immediately and irreversibly
    PermanentDelete,
}

impl Mode {
    /// Resolve the mode from CLI flags; at most one may be set.
    pub fn from_flags(dry_run: bool, trash: bool, hard_delete: bool) -> Result<Self> {
        match (dry_run, trash, hard_delete) {
            (_, false, false) => Ok(Mode::Preview),
            (false, true, false) => Ok(Mode::MoveToTrash),
            (false, false, true) => Ok(Mode::PermanentDelete),
            _ => Err(GmailError::InvalidArguments(
                "choose only one of --dry-run, --trash and --hard-delete".to_string(),
            )),
        }
    }

    pub fn is_destructive(&self) -> bool {
        !matches!(self, Mode::Preview)
    }

    /// Past-tense verb used in summaries
    pub fn verb(&self) -> &'static str {
        match self {
            Mode::Preview => "Matched",
            Mode::MoveToTrash => "Trashed",
            Mode::PermanentDelete => "Deleted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Preview => write!(f, "DRY-RUN (no changes)"),
            Mode::MoveToTrash => write!(f, "TRASH (move to Trash)"),
            Mode::PermanentDelete => write!(f, "HARD DELETE (irreversible)"),
        }
    }
}

/// Final result of processing one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Succeeded,
    SkippedPermanent,
}

/// Counters for a single destructive pass
#[derive(Debug, Clone)]
pub struct RunStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub done: usize,
    pub skipped: usize,
    started: Instant,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            total,
            done: 0,
            skipped: 0,
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Succeeded => self.done += 1,
            ActionOutcome::SkippedPermanent => self.skipped += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.done + self.skipped
    }

    /// Successful actions per second, with elapsed time floored at one second
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64().max(1.0);
        self.done as f64 / elapsed
    }
}

/// Outcome of a whole run, rendered by the CLI
#[derive(Debug, Clone)]
pub enum RunReport {
    /// Snapshot computed, nothing mutated
    Preview { total: usize },
    /// Destructive mode, but the operator declined
    Cancelled { total: usize },
    /// Destructive pass finished
    Completed { mode: Mode, stats: RunStats },
}

impl RunReport {
    pub fn total(&self) -> usize {
        match self {
            RunReport::Preview { total } | RunReport::Cancelled { total } => *total,
            RunReport::Completed { stats, .. } => stats.total,
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Preview { total } => write!(
                f,
                "DRY-RUN: {} matching messages, nothing was deleted. Specify --trash or --hard-delete to execute changes.",
                total
            ),
            RunReport::Cancelled { total } => {
                write!(f, "Operation cancelled. {} matching messages left untouched.", total)
            }
            RunReport::Completed { mode, stats } => write!(
                f,
                "DONE. Total processed: {}. {}: {}. Skipped: {}.",
                stats.total,
                mode.verb(),
                stats.done,
                stats.skipped
            ),
        }
    }
}
