use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};

use crate::wiki::client::{ArticleError, ArticleService};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WikiSummary {
    pub title: String,
    pub text: String,
}

/// Loaded article summaries, newest first, plus the one on display.
#[derive(Clone, Debug, Default)]
pub struct SummaryCollection {
    entries: Vec<WikiSummary>,
    current: Option<String>,
}

impl SummaryCollection {
    pub fn new() -> Self {
        SummaryCollection::default()
    }

    pub fn entries(&self) -> &[WikiSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.entries.iter().any(|s| s.title == title)
    }

    pub fn current(&self) -> Option<&WikiSummary> {
        let title = self.current.as_deref()?;
        self.entries.iter().find(|s| s.title == title)
    }

    /// Labels from `labels` without a loaded summary yet, first occurrence only.
    pub fn missing(&self, labels: &[String]) -> Vec<String> {
        let mut seen = BTreeSet::new();
        labels
            .iter()
            .filter(|l| !self.contains(l) && seen.insert(l.as_str()))
            .cloned()
            .collect()
    }

    /// Add to the front. The first summary ever added becomes current.
    /// Returns false when a summary with this title is already loaded.
    pub fn prepend(&mut self, summary: WikiSummary) -> bool {
        if self.contains(&summary.title) {
            return false;
        }
        if self.entries.is_empty() {
            self.current = Some(summary.title.clone());
        }
        self.entries.insert(0, summary);
        true
    }

    pub fn select(&mut self, title: &str) -> bool {
        if self.contains(title) {
            self.current = Some(title.to_string());
            true
        } else {
            false
        }
    }

    /// Close a tab. Closing the current one moves to the next tab, or the
    /// previous when it was last.
    pub fn close(&mut self, title: &str) -> bool {
        let Some(i) = self.entries.iter().position(|s| s.title == title) else {
            return false;
        };
        self.entries.remove(i);
        if self.current.as_deref() == Some(title) {
            self.current = if self.entries.is_empty() {
                None
            } else if i < self.entries.len() {
                Some(self.entries[i].title.clone())
            } else {
                Some(self.entries[i - 1].title.clone())
            };
        }
        true
    }
}

async fn fetch_summary<A: ArticleService>(service: &A, label: &str) -> Result<WikiSummary, ArticleError> {
    let hit = service.search(label).await?;
    let text = service.extract(hit.pageid).await?;
    Ok(WikiSummary { title: hit.title, text })
}

async fn fetch_link<A: ArticleService>(service: &A, label: &str) -> Result<String, ArticleError> {
    let hit = service.search(label).await?;
    service.link(hit.pageid).await
}

/// Look up summaries for `labels`, at most `limit` at a time. Every lookup
/// settles on its own; results come back in completion order.
pub async fn fetch_summaries<A: ArticleService>(
    service: &A,
    labels: &[String],
    limit: usize,
) -> Vec<(String, Result<WikiSummary, ArticleError>)> {
    stream::iter(labels.iter().cloned())
        .map(|label| async move {
            let res = fetch_summary(service, &label).await;
            (label, res)
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}

/// Resolve `labels` to page URLs, at most `limit` at a time.
pub async fn fetch_links<A: ArticleService>(
    service: &A,
    labels: &[String],
    limit: usize,
) -> Vec<(String, Result<String, ArticleError>)> {
    stream::iter(labels.iter().cloned())
        .map(|label| async move {
            let res = fetch_link(service, &label).await;
            (label, res)
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await
}
