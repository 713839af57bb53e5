//! Lazy pagination over `messages.list`

use async_stream::try_stream;
use futures::stream::Stream;
use std::collections::VecDeque;
use tracing::debug;

use crate::client::GmailClient;
use crate::error::Result;

/// Cursor over the message IDs matching a query.
///
/// Pages are requested only when the buffered IDs run out, so a consumer that
/// stops early never triggers further listing calls. The pager holds the last
/// continuation token and cannot seek; start over with a new pager.
///
/// Listing errors are returned as-is and never retried.
pub struct MessagePager<'a, C: GmailClient + ?Sized> {
    client: &'a C,
    query: String,
    page_size: u32,
    page_token: Option<String>,
    buffered: VecDeque<String>,
    pages_fetched: usize,
    exhausted: bool,
}

impl<'a, C: GmailClient + ?Sized> MessagePager<'a, C> {
    pub fn new(client: &'a C, query: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            query: query.into(),
            page_size,
            page_token: None,
            buffered: VecDeque::new(),
            pages_fetched: 0,
            exhausted: false,
        }
    }

    /// Next message ID, fetching another page when needed.
    /// `Ok(None)` once the last page has been drained.
    pub async fn next_id(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(id) = self.buffered.pop_front() {
                return Ok(Some(id));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let page = self
            .client
            .list_messages_page(&self.query, self.page_token.take(), self.page_size)
            .await?;
        self.pages_fetched += 1;

        debug!(
            page = self.pages_fetched,
            ids = page.ids.len(),
            "Fetched message page"
        );

        self.buffered.extend(page.ids);
        match page.next_page_token {
            Some(token) => self.page_token = Some(token),
            None => self.exhausted = true,
        }
        Ok(())
    }

    /// Turn the pager into a stream of IDs; the first error ends the stream.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<String>> + 'a {
        try_stream! {
            while let Some(id) = self.next_id().await? {
                yield id;
            }
        }
    }
}
