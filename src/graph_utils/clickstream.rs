use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use super::graph::{Link, NodeId, Page};

// Referrer pseudo-pages in the raw clickstream dump; they are not articles.
const IGNORED_SOURCES: [&str; 6] = [
    "other",
    "other-empty",
    "other-external",
    "other-internal",
    "other-other",
    "other-search",
];

#[derive(Debug, Deserialize)]
struct ClickstreamRow {
    prev: String,
    curr: String,
    #[serde(rename = "type")]
    kind: String,
    n: u64,
}

/// The full page/link dataset held in memory. Stands in for the remote
/// graph database when running locally or under test.
#[derive(Clone, Debug, Default)]
pub struct ClickstreamStore {
    pages: BTreeMap<NodeId, Page>,
    by_title: HashMap<String, NodeId>,
    // keyed by (from, to)
    links: BTreeMap<(NodeId, NodeId), Link>,
    next_id: NodeId,
}

impl ClickstreamStore {
    pub fn new() -> Self {
        ClickstreamStore::default()
    }

    /// Load a processed clickstream export: `prev,curr,type,n` rows, no header.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| anyhow!("failed to open clickstream {}: {}", path.display(), e))?;
        Self::from_reader(reader)
    }

    pub fn from_csv_str(data: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());
        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut store = ClickstreamStore::new();
        let mut skipped = 0usize;
        for (line, record) in reader.deserialize::<ClickstreamRow>().enumerate() {
            let row = record.map_err(|e| anyhow!("clickstream line {}: {}", line + 1, e))?;
            if row.kind != "link" || IGNORED_SOURCES.contains(&row.prev.as_str()) {
                skipped += 1;
                continue;
            }
            let from = store.add_page(row.prev.trim());
            let to = store.add_page(row.curr.trim());
            store.add_link(from, to, row.n);
        }
        log::info!(
            "loaded clickstream: {} pages, {} links ({} rows skipped)",
            store.pages.len(),
            store.links.len(),
            skipped
        );
        Ok(store)
    }

    // Return the id for `title`, creating the page on first sight
    pub fn add_page(&mut self, title: &str) -> NodeId {
        if let Some(id) = self.by_title.get(title) {
            return *id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.pages.insert(id, Page { id, title: title.to_string(), weight: 0 });
        self.by_title.insert(title.to_string(), id);
        id
    }

    // Record clicks from one page to another; repeated pairs accumulate
    pub fn add_link(&mut self, from: NodeId, to: NodeId, quantity: u64) -> bool {
        if !self.pages.contains_key(&from) || !self.pages.contains_key(&to) {
            return false;
        }
        self.links
            .entry((from, to))
            .and_modify(|l| l.quantity += quantity)
            .or_insert(Link { from, to, quantity });
        if let Some(target) = self.pages.get_mut(&to) {
            target.weight += quantity;
        }
        true
    }

    pub fn page(&self, id: NodeId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub fn page_by_title(&self, title: &str) -> Option<&Page> {
        self.by_title.get(title).and_then(|id| self.pages.get(id))
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links with `id` at either end.
    pub fn links_touching(&self, id: NodeId) -> Vec<&Link> {
        self.links
            .values()
            .filter(|l| l.from == id || l.to == id)
            .collect()
    }

    pub fn link(&self, from: NodeId, to: NodeId) -> Option<&Link> {
        self.links.get(&(from, to))
    }

    // Pages one hop away from `id`, ignoring direction
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .links_touching(id)
            .into_iter()
            .map(|l| if l.from == id { l.to } else { l.from })
            .filter(|other| *other != id)
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Best fuzzy title match strictly above `threshold`; ties go to the lowest id.
    pub fn best_title_match(&self, text: &str, threshold: f64) -> Option<&Page> {
        let mut best: Option<(&Page, f64)> = None;
        for page in self.pages.values() {
            let score = levenshtein_similarity(&page.title, text);
            if score <= threshold {
                continue;
            }
            match best {
                Some((_, s)) if s >= score => {}
                _ => best = Some((page, score)),
            }
        }
        best.map(|(p, _)| p)
    }
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// `1 - distance / longer_length`, in `[0, 1]`; two empty strings are identical.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}
