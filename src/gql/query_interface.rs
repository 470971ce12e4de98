use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use time::{macros::format_description, OffsetDateTime};

use crate::graph_utils::clickstream::ClickstreamStore;
use crate::graph_utils::graph::{Link, NodeId, Page};
use super::query_builder::{CypherQuery, QueryKind};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct QueryOutcome {
    pub pages: Vec<Page>,
    pub links: Vec<Link>,
}

impl QueryOutcome {
    /// Number of distinct pages returned; the engine reports this on completion.
    pub fn cardinality(&self) -> usize {
        self.pages.len()
    }

    fn push_page(&mut self, seen: &mut BTreeSet<NodeId>, page: &Page) {
        if seen.insert(page.id) {
            self.pages.push(page.clone());
        }
    }
}

fn log_path_for_now(dir: &Path) -> PathBuf {
    let now = OffsetDateTime::now_utc();
    let fmt = format_description!("[year][month][day]");
    let date = now.format(&fmt).unwrap_or_else(|_| "unknown".into());
    dir.join(format!("queries_{}.log", date))
}

fn log_query(dir: &Path, query: &CypherQuery, outcome: &Result<QueryOutcome>) {
    let _ = create_dir_all(dir);
    let path = log_path_for_now(dir);
    let now = OffsetDateTime::now_utc();
    let ts_fmt = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let ts = now.format(&ts_fmt).unwrap_or_else(|_| "".into());
    let status = match outcome {
        Ok(o) => format!("OK pages={} links={}", o.pages.len(), o.links.len()),
        Err(e) => format!("ERR {}", e),
    };
    let params = serde_json::to_string(&query.params).unwrap_or_else(|_| "{}".into());
    let line = format!("{} | {:?} | {}\n{}\n{}\n\n", ts, query.kind, status, query.text.trim(), params);
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = file.write_all(line.as_bytes());
    }
}

pub fn execute_query(store: &ClickstreamStore, query: &CypherQuery) -> Result<QueryOutcome> {
    match query.kind {
        QueryKind::TitleExpand => {
            let title = query.text_param("title")?;
            let ids: Vec<NodeId> = store.page_by_title(title).map(|p| p.id).into_iter().collect();
            Ok(expand(store, &ids))
        }
        QueryKind::Expand => Ok(expand(store, &query.int_list("ids")?)),
        QueryKind::Neighborhood => {
            let ids = query.int_list("ids")?;
            let limit = query.int("limit")?;
            if limit < 0 {
                return Err(anyhow!("negative LIMIT: {}", limit));
            }
            Ok(neighborhood(store, &ids, limit as usize))
        }
        QueryKind::FuzzyExpand => {
            let text = query.text_param("text")?;
            let threshold = query.float("threshold")?;
            let ids: Vec<NodeId> = store
                .best_title_match(text, threshold)
                .map(|p| p.id)
                .into_iter()
                .collect();
            Ok(expand(store, &ids))
        }
        QueryKind::ShortestPath => {
            let a = query.int("a")?;
            let b = query.int("b")?;
            let max_hops = query.int("max_hops")?.max(1) as usize;
            Ok(shortest_path(store, a, b, max_hops))
        }
    }
}

pub fn execute_and_log(store: &ClickstreamStore, query: &CypherQuery, log_dir: Option<&Path>) -> Result<QueryOutcome> {
    let res = execute_query(store, query);
    if let Some(dir) = log_dir {
        log_query(dir, query, &res);
    }
    res
}

// Each existing page plus every link touching it; a page without links
// comes back on its own.
fn expand(store: &ClickstreamStore, ids: &[NodeId]) -> QueryOutcome {
    let mut out = QueryOutcome::default();
    let mut seen = BTreeSet::new();
    let mut seen_links = BTreeSet::new();
    for id in ids {
        let Some(page) = store.page(*id) else { continue };
        out.push_page(&mut seen, page);
        let mut links = store.links_touching(*id);
        links.sort_by(|a, b| b.quantity.cmp(&a.quantity));
        for link in links {
            if !seen_links.insert((link.from, link.to)) {
                continue;
            }
            let other = if link.from == *id { link.to } else { link.from };
            if let Some(p) = store.page(other) {
                out.push_page(&mut seen, p);
            }
            out.links.push(link.clone());
        }
    }
    out
}

fn neighborhood(store: &ClickstreamStore, ids: &[NodeId], limit: usize) -> QueryOutcome {
    let wanted: BTreeSet<NodeId> = ids.iter().copied().collect();
    let mut links: Vec<&Link> = Vec::new();
    let mut seen_links = BTreeSet::new();
    for id in &wanted {
        for link in store.links_touching(*id) {
            if seen_links.insert((link.from, link.to)) {
                links.push(link);
            }
        }
    }
    links.sort_by(|a, b| b.quantity.cmp(&a.quantity).then((a.from, a.to).cmp(&(b.from, b.to))));
    links.truncate(limit);

    let mut out = QueryOutcome::default();
    let mut seen = BTreeSet::new();
    for link in links {
        for end in [link.from, link.to] {
            if let Some(p) = store.page(end) {
                out.push_page(&mut seen, p);
            }
        }
        out.links.push(link.clone());
    }
    out
}

// Breadth-first search ignoring link direction
fn shortest_path(store: &ClickstreamStore, a: NodeId, b: NodeId, max_hops: usize) -> QueryOutcome {
    let mut out = QueryOutcome::default();
    if store.page(a).is_none() || store.page(b).is_none() {
        return out;
    }
    let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
    let mut depth: HashMap<NodeId, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    depth.insert(a, 0);
    queue.push_back(a);
    while let Some(cur) = queue.pop_front() {
        if cur == b {
            break;
        }
        let d = depth[&cur];
        if d >= max_hops {
            continue;
        }
        for next in store.neighbors(cur) {
            if depth.contains_key(&next) {
                continue;
            }
            depth.insert(next, d + 1);
            parent.insert(next, cur);
            queue.push_back(next);
        }
    }
    if !depth.contains_key(&b) {
        return out;
    }

    let mut path = vec![b];
    let mut cur = b;
    while let Some(prev) = parent.get(&cur) {
        path.push(*prev);
        cur = *prev;
    }
    path.reverse();

    let mut seen = BTreeSet::new();
    for id in &path {
        if let Some(p) = store.page(*id) {
            out.push_page(&mut seen, p);
        }
    }
    for pair in path.windows(2) {
        let (x, y) = (pair[0], pair[1]);
        if let Some(link) = store.link(x, y).or_else(|| store.link(y, x)) {
            out.links.push(link.clone());
        }
    }
    out
}
