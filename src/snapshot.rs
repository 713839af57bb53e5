//! Frozen selection of messages for one run

use futures::TryStreamExt;
use tracing::info;

use crate::client::GmailClient;
use crate::error::Result;
use crate::pager::MessagePager;

/// Ordered message IDs selected before any mutation.
///
/// Built once per run and never re-queried, so messages trashed or arriving
/// mid-run cannot grow or shrink the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    ids: Vec<String>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.ids.iter()
    }
}

impl From<Vec<String>> for Snapshot {
    fn from(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl<'s> IntoIterator for &'s Snapshot {
    type Item = &'s String;
    type IntoIter = std::slice::Iter<'s, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Drain a pager into a snapshot, stopping once `limit` IDs are held.
/// A `limit` of 0 means no cap.
pub async fn build_snapshot<C: GmailClient + ?Sized>(
    pager: MessagePager<'_, C>,
    limit: usize,
) -> Result<Snapshot> {
    let mut ids = Vec::new();
    let mut stream = Box::pin(pager.into_stream());

    while let Some(id) = stream.try_next().await? {
        ids.push(id);
        if limit > 0 && ids.len() >= limit {
            break;
        }
    }

    info!("Found {} matching messages.", ids.len());
    Ok(Snapshot { ids })
}
