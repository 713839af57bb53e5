//! Command-line interface

use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use inquire::InquireError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth;
use crate::client::ProductionGmailClient;
use crate::config::Config;
use crate::error::{GmailError, Result};
use crate::label_guard::ProtectedLabels;
use crate::models::{Mode, RunReport};
use crate::orchestrator::{BatchOrchestrator, PurgeRequest};
use crate::rate_limiter::QuotaRateLimiter;

#[derive(Parser, Debug)]
#[command(name = "gmail-purge")]
#[command(version = "0.1.0")]
#[command(about = "Bulk trash or delete Gmail messages matching a search query", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".gmail-purge/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub purge: PurgeArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct PurgeArgs {
    /// Only count matching messages (default when no mode is given)
    #[arg(long, conflicts_with_all = ["trash", "hard_delete"])]
    pub dry_run: bool,

    /// Move matching messages to Trash
    #[arg(long, conflicts_with = "hard_delete")]
    pub trash: bool,

    /// Permanently delete matching messages (irreversible)
    #[arg(long)]
    pub hard_delete: bool,

    /// Gmail search query, overrides the configured one
    #[arg(short, long)]
    pub query: Option<String>,

    /// Label to keep out of the batch (repeatable)
    #[arg(long = "protect-label", value_name = "LABEL")]
    pub protect_label: Vec<String>,

    /// Stop after this many messages (0 = no limit)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Message IDs requested per listing page (1-500)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an example configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl PurgeArgs {
    pub fn mode(&self) -> Result<Mode> {
        Mode::from_flags(self.dry_run, self.trash, self.hard_delete)
    }

    /// Merge flags over the configuration file.
    ///
    /// Flags win for scalar settings; protect labels from both sources are
    /// combined, file entries first.
    pub fn to_request(&self, config: &Config) -> Result<PurgeRequest> {
        let mode = self.mode()?;

        let page_size = self.page_size.unwrap_or(config.purge.page_size);
        if page_size == 0 || page_size > 500 {
            return Err(GmailError::InvalidArguments(format!(
                "--page-size must be between 1 and 500, got {}",
                page_size
            )));
        }

        let query = self
            .query
            .clone()
            .unwrap_or_else(|| config.purge.query.clone());
        if query.trim().is_empty() {
            return Err(GmailError::InvalidArguments(
                "search query must not be empty".to_string(),
            ));
        }

        let labels = ProtectedLabels::try_new(
            config
                .purge
                .protect_labels
                .iter()
                .chain(self.protect_label.iter())
                .cloned(),
        )?;

        Ok(PurgeRequest::new(query, mode)
            .with_protected_labels(labels)
            .with_limit(self.limit.unwrap_or(config.purge.limit))
            .with_page_size(page_size))
    }
}

pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    /// Share a `MultiProgress` with the tracing writer so logs print above bars
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

/// Ask the operator before anything is trashed or deleted
fn confirm(reporter: &ProgressReporter, mode: Mode, total: usize) -> Result<bool> {
    let prompt = match mode {
        Mode::PermanentDelete => format!(
            "PERMANENTLY delete {} messages? This cannot be undone.",
            total
        ),
        _ => format!("Move {} messages to Trash?", total),
    };

    let answer = reporter.multi_progress().suspend(|| {
        inquire::Confirm::new(&prompt).with_default(false).prompt()
    });
    confirmation_from(answer)
}

/// Esc and Ctrl-C decline the run; only a missing terminal is an error.
fn confirmation_from(answer: std::result::Result<bool, InquireError>) -> Result<bool> {
    match answer {
        Ok(confirmed) => Ok(confirmed),
        Err(InquireError::OperationCanceled) | Err(InquireError::OperationInterrupted) => Ok(false),
        Err(InquireError::NotTTY) => Err(GmailError::InvalidArguments(
            "no terminal available for the confirmation prompt; pass --yes to proceed without it"
                .to_string(),
        )),
        Err(InquireError::IO(e)) => Err(GmailError::IoError(e)),
        Err(e) => Err(GmailError::InvalidArguments(format!(
            "confirmation prompt failed: {}",
            e
        ))),
    }
}

/// Run one purge: authenticate, snapshot, confirm, apply
pub async fn run_purge(cli: &Cli, multi: MultiProgress) -> Result<RunReport> {
    let reporter = ProgressReporter::with_multi_progress(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await?;
    let request = cli.purge.to_request(&config)?;
    reporter.finish_spinner(
        &config_spinner,
        &format!("Configuration loaded from {:?}", cli.config),
    );

    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let scope = auth::scope_for_mode(request.mode);
    let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache, request.mode).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated successfully");

    let client = ProductionGmailClient::new(hub, QuotaRateLimiter::from_config(&config.quota), scope);

    let search_spinner = reporter.add_spinner("Searching for messages...");
    let orchestrator = BatchOrchestrator::from_config(&client, &config);
    let prepared = orchestrator.prepare(&request).await?;
    reporter.finish_spinner(
        &search_spinner,
        &format!("Found {} matching messages", prepared.total()),
    );

    let confirmed = if !request.mode.is_destructive() || prepared.total() == 0 {
        true
    } else if cli.purge.yes {
        tracing::info!("Confirmation skipped (--yes)");
        true
    } else {
        confirm(&reporter, request.mode, prepared.total())?
    };

    let report = if request.mode.is_destructive() && confirmed && prepared.total() > 0 {
        let bar = reporter.add_progress_bar(prepared.total() as u64, request.mode.verb());
        let tick = bar.clone();
        let report = orchestrator
            .with_progress(Arc::new(move |processed, _total| {
                tick.set_position(processed as u64)
            }))
            .execute(&prepared, confirmed)
            .await;
        bar.finish_and_clear();
        report
    } else {
        orchestrator.execute(&prepared, confirmed).await
    };

    let stats = client.quota_stats().await;
    tracing::debug!(
        units = stats.total_consumed,
        operations = stats.total_operations,
        waited = ?stats.total_waited,
        "Quota usage"
    );

    Ok(report)
}
