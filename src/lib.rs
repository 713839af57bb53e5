//! Gmail bulk purge
//!
//! Selects every message matching a Gmail search query, freezes the result
//! into a snapshot, then moves each message to Trash or deletes it
//! permanently, one at a time, retrying transient API errors with capped
//! exponential backoff.
//!
//! # Overview
//!
//! - **Enumeration**: [`pager::MessagePager`] walks `messages.list` page by page
//! - **Snapshot**: [`snapshot::build_snapshot`] collects IDs before anything changes
//! - **Protection**: [`label_guard::LabelGuard`] keeps protected labels out of the query
//! - **Actuation**: [`retry::RetryingActuator`] classifies and retries each call
//! - **Orchestration**: [`orchestrator::BatchOrchestrator`] ties it together and counts
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_purge::{auth, client::ProductionGmailClient, config::Config};
//! use gmail_purge::orchestrator::{BatchOrchestrator, PurgeRequest};
//! use gmail_purge::rate_limiter::QuotaRateLimiter;
//! use gmail_purge::Mode;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!     let mode = Mode::MoveToTrash;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".gmail-purge/token.json".as_ref(),
//!         mode,
//!     )
//!     .await?;
//!     let client = ProductionGmailClient::new(
//!         hub,
//!         QuotaRateLimiter::from_config(&config.quota),
//!         auth::scope_for_mode(mode),
//!     );
//!
//!     let request = PurgeRequest::new("older_than:10y in:inbox", mode);
//!     let report = BatchOrchestrator::from_config(&client, &config)
//!         .run(&request, true)
//!         .await?;
//!     println!("{}", report);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Gmail API client trait and quota-paced production client
//! - [`cli`] - Command-line interface and progress display
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`label_guard`] - Protect-list handling
//! - [`models`] - Core data structures
//! - [`orchestrator`] - Run driver and accounting
//! - [`pager`] - Paginated message enumeration
//! - [`rate_limiter`] - Quota-unit token bucket
//! - [`retry`] - Per-message retry and classification
//! - [`snapshot`] - Frozen selection of message IDs

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod label_guard;
pub mod models;
pub mod orchestrator;
pub mod pager;
pub mod rate_limiter;
pub mod retry;
pub mod snapshot;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{ActionOutcome, MessageLabels, MessagePage, Mode, RunReport, RunStats};

// Config types
pub use config::{Config, PurgeConfig, QuotaConfig, RetryConfig, ThrottleConfig};

// Client traits
pub use client::{GmailClient, ProductionGmailClient};

// Pipeline
pub use label_guard::{LabelGuard, ProtectedLabels};
pub use orchestrator::{BatchOrchestrator, PreparedRun, PurgeRequest};
pub use pager::MessagePager;
pub use retry::{AttemptOutcome, DestructiveAction, RetryPolicy, RetryingActuator};
pub use snapshot::{build_snapshot, Snapshot};

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};
