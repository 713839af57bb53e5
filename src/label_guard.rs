//! Protect-list policy for labeled messages
//!
//! Protection is applied in two places:
//! - as `-label:"<name>"` clauses appended to the search query, resolved by
//!   Gmail's search index before the snapshot is taken;
//! - as a per-message metadata check during the destructive pass.
//!
//! The per-message check is currently inert. It fetches the message's label
//! IDs, but protected labels are configured by display name and no
//! name-to-ID mapping is built, so the IDs are never compared and the message
//! always proceeds. Protection is therefore only as good as the query-level
//! exclusion.

use std::collections::HashSet;
use tracing::debug;

use crate::client::GmailClient;
use crate::error::{GmailError, Result};

/// Label names the caller wants kept out of the batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedLabels {
    names: Vec<String>,
}

impl ProtectedLabels {
    /// Blank names are dropped; duplicates keep their first position.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(Into::into)
            .map(|n: String| n.trim().to_string())
            .filter(|n| !n.is_empty() && seen.insert(n.clone()))
            .collect();
        Self { names }
    }

    /// Like [`ProtectedLabels::new`], but rejects names that cannot be quoted
    /// in a Gmail search (see [`LabelGuard::exclusion_query`]).
    pub fn try_new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = Self::new(names);
        if let Some(bad) = labels.names.iter().find(|n| !is_quotable(n)) {
            return Err(GmailError::InvalidArguments(format!(
                "protected label {:?} contains a double quote",
                bad
            )));
        }
        Ok(labels)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// Gmail search has no escape for `"` inside a quoted term
pub fn is_quotable(name: &str) -> bool {
    !name.contains('"')
}

/// What the per-message check found. Never blocks the action today.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelInspection {
    pub label_ids: HashSet<String>,
    pub fetched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LabelGuard {
    protected: ProtectedLabels,
}

impl LabelGuard {
    pub fn new(protected: ProtectedLabels) -> Self {
        Self { protected }
    }

    /// Append one negated label clause per protected label.
    ///
    /// Names are wrapped in double quotes verbatim. A name containing `"`
    /// would break the query; [`ProtectedLabels::try_new`] and
    /// `Config::validate` refuse such names.
    pub fn exclusion_query(&self, query: &str) -> String {
        let mut q = query.to_string();
        for label in self.protected.names() {
            q.push_str(&format!(" -label:\"{}\"", label));
        }
        q
    }

    /// Fetch the message's label IDs when a protect-list is configured.
    ///
    /// The returned IDs are informational only; see the module docs. A failed
    /// fetch is treated as "no labels".
    pub async fn inspect<C: GmailClient + ?Sized>(&self, client: &C, id: &str) -> LabelInspection {
        if self.protected.is_empty() {
            return LabelInspection::default();
        }

        match client.get_message_labels(id).await {
            Ok(labels) => {
                debug!(
                    message_id = %id,
                    labels = labels.label_ids.len(),
                    "Fetched label IDs; name-to-ID matching is not performed"
                );
                LabelInspection {
                    label_ids: labels.label_ids,
                    fetched: true,
                }
            }
            Err(e) => {
                debug!(message_id = %id, error = %e, "Label fetch failed, continuing without labels");
                LabelInspection::default()
            }
        }
    }
}
