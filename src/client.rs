//! Gmail API client used by the purge pipeline

use async_trait::async_trait;
use google_gmail1::{hyper_rustls, hyper_util, Gmail};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{GmailError, Result};
use crate::models::{MessageLabels, MessagePage};
use crate::rate_limiter::{QuotaCost, QuotaRateLimiter, QuotaStats};

/// Scope sufficient for listing, reading metadata and trashing
pub const MODIFY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.modify";

/// Full mailbox scope; `messages.delete` is refused under anything narrower
pub const FULL_ACCESS_SCOPE: &str = "https://mail.google.com/";

/// The four remote operations the purge pipeline needs.
///
/// Implementations must already be authenticated. None of the methods retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// Fetch one page of message IDs matching a query
    async fn list_messages_page(
        &self,
        query: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<MessagePage>;

    /// Fetch the label IDs attached to a message
    async fn get_message_labels(&self, id: &str) -> Result<MessageLabels>;

    /// Move a message to Trash
    async fn trash_message(&self, id: &str) -> Result<()>;

    /// Delete a message immediately, bypassing Trash
    async fn delete_message(&self, id: &str) -> Result<()>;
}

type HttpsConnector = hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Production Gmail client backed by the `google-gmail1` hub.
///
/// Every call first takes its quota units from a token bucket and is bounded
/// by a per-call timeout.
pub struct ProductionGmailClient {
    hub: Gmail<HttpsConnector>,
    quota: QuotaRateLimiter,
    scope: &'static str,
    call_timeout: Duration,
}

impl ProductionGmailClient {
    /// # Arguments
    /// * `hub` - Authenticated Gmail API hub
    /// * `quota` - Token bucket shared by all calls of this client
    /// * `scope` - OAuth scope requested on every call; must match the scope the token was granted
    pub fn new(hub: Gmail<HttpsConnector>, quota: QuotaRateLimiter, scope: &'static str) -> Self {
        Self {
            hub,
            quota,
            scope,
            call_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub async fn quota_stats(&self) -> QuotaStats {
        self.quota.stats().await
    }

    /// Run one API call under the per-call timeout, converting its error
    async fn timed<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, google_gmail1::Error>>,
    {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(GmailError::from),
            Err(_) => {
                warn!("Gmail API {} call timed out after {:?}", operation, self.call_timeout);
                Err(GmailError::NetworkError(format!(
                    "API call timed out after {:?}",
                    self.call_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn list_messages_page(
        &self,
        query: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<MessagePage> {
        self.quota.acquire(QuotaCost::List).await;

        let mut call = self
            .hub
            .users()
            .messages_list("me")
            .q(query)
            .max_results(page_size);
        if let Some(token) = page_token.as_deref() {
            call = call.page_token(token);
        }

        let (_, response) = self.timed("messages.list", call.add_scope(self.scope).doit()).await?;

        let ids: Vec<String> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| m.id)
            .collect();

        debug!(
            "Listed page with {} message IDs (more pages: {})",
            ids.len(),
            response.next_page_token.is_some()
        );

        Ok(MessagePage {
            ids,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_message_labels(&self, id: &str) -> Result<MessageLabels> {
        self.quota.acquire(QuotaCost::Get).await;

        let call = self
            .hub
            .users()
            .messages_get("me", id)
            .format("minimal")
            .add_scope(self.scope)
            .doit();
        let (_, msg) = self.timed("messages.get", call).await?;

        let label_ids: HashSet<String> = msg.label_ids.unwrap_or_default().into_iter().collect();
        Ok(MessageLabels {
            id: msg.id.unwrap_or_else(|| id.to_string()),
            label_ids,
        })
    }

    async fn trash_message(&self, id: &str) -> Result<()> {
        self.quota.acquire(QuotaCost::Trash).await;

        let call = self
            .hub
            .users()
            .messages_trash("me", id)
            .add_scope(self.scope)
            .doit();
        self.timed("messages.trash", call).await?;
        Ok(())
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        self.quota.acquire(QuotaCost::Delete).await;

        let call = self
            .hub
            .users()
            .messages_delete("me", id)
            .add_scope(self.scope)
            .doit();
        self.timed("messages.delete", call).await?;
        Ok(())
    }
}

// Shared ownership across callers
#[async_trait]
impl<T: GmailClient + ?Sized> GmailClient for Arc<T> {
    async fn list_messages_page(
        &self,
        query: &str,
        page_token: Option<String>,
        page_size: u32,
    ) -> Result<MessagePage> {
        self.as_ref().list_messages_page(query, page_token, page_size).await
    }

    async fn get_message_labels(&self, id: &str) -> Result<MessageLabels> {
        self.as_ref().get_message_labels(id).await
    }

    async fn trash_message(&self, id: &str) -> Result<()> {
        self.as_ref().trash_message(id).await
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        self.as_ref().delete_message(id).await
    }
}
