//! Common test utilities and fixtures
#![allow(dead_code)]

use async_trait::async_trait;
use gmail_purge::client::GmailClient;
use gmail_purge::error::{GmailError, Result};
use gmail_purge::models::{MessageLabels, MessagePage};
use mockall::mock;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

mock! {
    pub GmailClient {}

    #[async_trait::async_trait]
    impl GmailClient for GmailClient {
        async fn list_messages_page(
            &self,
            query: &str,
            page_token: Option<String>,
            page_size: u32,
        ) -> Result<MessagePage>;
        async fn get_message_labels(&self, id: &str) -> Result<MessageLabels>;
        async fn trash_message(&self, id: &str) -> Result<()>;
        async fn delete_message(&self, id: &str) -> Result<()>;
    }
}

/// Build a page of IDs from string literals
pub fn page(ids: &[&str], next_page_token: Option<&str>) -> MessagePage {
    MessagePage {
        ids: ids.iter().map(|s| s.to_string()).collect(),
        next_page_token: next_page_token.map(str::to_string),
    }
}

/// One scripted answer to a trash/delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Status(u16),
    Network,
}

impl Reply {
    fn into_result(self, id: &str) -> Result<()> {
        match self {
            Reply::Ok => Ok(()),
            Reply::Status(status) => Err(GmailError::from_status(
                status,
                format!("scripted status for {}", id),
            )),
            Reply::Network => Err(GmailError::NetworkError("connection reset by peer".into())),
        }
    }
}

/// One scripted `messages.list` page
#[derive(Debug, Clone)]
pub enum PageReply {
    Ids(Vec<String>),
    Fail(u16),
}

/// Fake client driven by per-message reply scripts.
///
/// Page `n` is answered for token `page-n`; trash/delete calls pop the next
/// reply for that message and succeed once the script is used up.
pub struct ScriptedClient {
    pages: Vec<PageReply>,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    attempts: Mutex<HashMap<String, usize>>,
    queries: Mutex<Vec<String>>,
    pub list_calls: AtomicUsize,
    pub label_calls: AtomicUsize,
    pub trash_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn with_pages(pages: Vec<PageReply>) -> Self {
        Self {
            pages,
            scripts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(HashMap::new()),
            queries: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            label_calls: AtomicUsize::new(0),
            trash_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn single_page(ids: &[&str]) -> Self {
        Self::with_pages(vec![PageReply::Ids(
            ids.iter().map(|s| s.to_string()).collect(),
        )])
    }

    /// Split `ids` into pages of `page_size`
    pub fn paged(ids: Vec<String>, page_size: usize) -> Self {
        let pages = if ids.is_empty() {
            vec![PageReply::Ids(Vec::new())]
        } else {
            ids.chunks(page_size.max(1))
                .map(|chunk| PageReply::Ids(chunk.to_vec()))
                .collect()
        };
        Self::with_pages(pages)
    }

    pub fn script(self, id: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), replies.into_iter().collect());
        self
    }

    pub fn attempts(&self, id: &str) -> usize {
        self.attempts.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn destructive_calls(&self) -> usize {
        self.trash_calls.load(Ordering::SeqCst) + self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn act(&self, id: &str) -> Result<()> {
        *self.attempts.lock().unwrap().entry(id.to_string()).or_insert(0) += 1;
        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|script| script.pop_front())
            .unwrap_or(Reply::Ok);
        reply.into_result(id)
    }
}

#[async_trait]
impl GmailClient for ScriptedClient {
    async fn list_messages_page(
        &self,
        query: &str,
        page_token: Option<String>,
        _page_size: u32,
    ) -> Result<MessagePage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.to_string());

        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| GmailError::from_status(400, format!("bad page token {}", token)))?,
        };

        match self.pages.get(index) {
            Some(PageReply::Ids(ids)) => Ok(MessagePage {
                ids: ids.clone(),
                next_page_token: (index + 1 < self.pages.len())
                    .then(|| format!("page-{}", index + 1)),
            }),
            Some(PageReply::Fail(status)) => Err(GmailError::from_status(
                *status,
                format!("listing page {} failed", index),
            )),
            None => Ok(MessagePage::default()),
        }
    }

    async fn get_message_labels(&self, id: &str) -> Result<MessageLabels> {
        self.label_calls.fetch_add(1, Ordering::SeqCst);
        Ok(MessageLabels {
            id: id.to_string(),
            label_ids: ["INBOX".to_string()].into_iter().collect(),
        })
    }

    async fn trash_message(&self, id: &str) -> Result<()> {
        self.trash_calls.fetch_add(1, Ordering::SeqCst);
        self.act(id)
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.act(id)
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}
