use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::graph_utils::graph::NodeId;
use crate::persistence::settings::AppSettings;

// NOTE: every user-supplied value (search text, id lists) travels as a bound
// parameter. Statement text only ever contains constants and numbers that
// come from settings, so a hostile page title cannot alter the query.

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    IntList(Vec<i64>),
    Float(f64),
    Text(String),
}

/// The shape of a built query. Collaborators that cannot run Cypher (the
/// bundled clickstream store) dispatch on this plus the bound parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum QueryKind {
    // A page found by exact title, with all of its links
    TitleExpand,
    // The given pages with all of their links
    Expand,
    // Strongest links touching the given pages, capped by `$limit`
    Neighborhood,
    // Best fuzzy title match above `$threshold`, with all of its links
    FuzzyExpand,
    // Shortest undirected path between `$a` and `$b`
    ShortestPath,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CypherQuery {
    pub kind: QueryKind,
    pub text: String,
    pub params: BTreeMap<String, ParamValue>,
}

impl CypherQuery {
    fn new(kind: QueryKind, text: impl Into<String>) -> Self {
        CypherQuery { kind, text: text.into(), params: BTreeMap::new() }
    }

    fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.param(name) {
            Some(ParamValue::Int(v)) => Ok(*v),
            other => Err(anyhow!("parameter ${} is not an integer: {:?}", name, other)),
        }
    }

    pub fn int_list(&self, name: &str) -> Result<Vec<i64>> {
        match self.param(name) {
            Some(ParamValue::IntList(v)) => Ok(v.clone()),
            other => Err(anyhow!("parameter ${} is not an integer list: {:?}", name, other)),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64> {
        match self.param(name) {
            Some(ParamValue::Float(v)) => Ok(*v),
            other => Err(anyhow!("parameter ${} is not a float: {:?}", name, other)),
        }
    }

    pub fn text_param(&self, name: &str) -> Result<&str> {
        match self.param(name) {
            Some(ParamValue::Text(v)) => Ok(v.as_str()),
            other => Err(anyhow!("parameter ${} is not a string: {:?}", name, other)),
        }
    }

    /// Statement in the shape the Neo4j transactional HTTP endpoint expects.
    pub fn to_statement_json(&self) -> serde_json::Value {
        serde_json::json!({
            "statement": self.text,
            "parameters": self.params,
        })
    }
}

/// A user intent against the visible graph. Controllers hand these around;
/// only [`QueryBuilder`] turns them into query text.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphMutationRequest {
    ExpandNodes(Vec<NodeId>),
    CreateFromSelection(Vec<NodeId>),
    KeepOnly(Vec<NodeId>),
    DeleteSelection(Vec<NodeId>),
    FindPath(NodeId, NodeId),
    SearchCreate(String),
    SearchAppend(String),
}

/// How a request reaches the rendering engine.
#[derive(Clone, Debug, PartialEq)]
pub enum PlannedMutation {
    // Replace the visible graph with the query result
    Render(CypherQuery),
    // Merge the query result into the visible graph
    Update(CypherQuery),
    // Remove every visible node not listed
    Prune { keep: Vec<NodeId> },
    // Remove the listed nodes, then any neighbor left without links
    Delete { ids: Vec<NodeId> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuilder {
    similarity_threshold: f64,
    links_per_selected_node: usize,
    max_path_hops: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        QueryBuilder::new(0.65, 10, 15)
    }
}

impl QueryBuilder {
    pub fn new(similarity_threshold: f64, links_per_selected_node: usize, max_path_hops: usize) -> Self {
        QueryBuilder {
            similarity_threshold,
            links_per_selected_node: links_per_selected_node.max(1),
            max_path_hops: max_path_hops.max(1),
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        QueryBuilder::new(
            settings.similarity_threshold,
            settings.links_per_selected_node,
            settings.max_path_hops,
        )
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Initial view: the page titled exactly `title` and its links.
    pub fn title_expand(&self, title: &str) -> CypherQuery {
        CypherQuery::new(
            QueryKind::TitleExpand,
            "MATCH (p1:Page) WHERE p1.title = $title \
             OPTIONAL MATCH (p1)-[l:LINKS_TO]-(p2:Page) \
             RETURN p1, l, p2 ORDER BY l.quantity DESC",
        )
        .with("title", ParamValue::Text(title.to_string()))
    }

    pub fn expand_nodes(&self, ids: &[NodeId]) -> CypherQuery {
        CypherQuery::new(
            QueryKind::Expand,
            "MATCH (p1:Page) WHERE ID(p1) IN $ids \
             OPTIONAL MATCH (p1)-[l:LINKS_TO]-(p2:Page) \
             RETURN p1, l, p2",
        )
        .with("ids", ParamValue::IntList(ids.to_vec()))
    }

    pub fn create_from_selection(&self, ids: &[NodeId]) -> CypherQuery {
        let limit = (self.links_per_selected_node * ids.len()) as i64;
        CypherQuery::new(
            QueryKind::Neighborhood,
            "MATCH (p1:Page)-[l:LINKS_TO]-(p2:Page) WHERE ID(p1) IN $ids \
             RETURN p1, l, p2 ORDER BY l.quantity DESC LIMIT $limit",
        )
        .with("ids", ParamValue::IntList(ids.to_vec()))
        .with("limit", ParamValue::Int(limit))
    }

    /// Fuzzy search shared by "create" and "append"; only the render mode differs.
    pub fn search(&self, text: &str) -> CypherQuery {
        CypherQuery::new(
            QueryKind::FuzzyExpand,
            "CALL { MATCH (p:Page) \
             WHERE apoc.text.levenshteinSimilarity(p.title, $text) > $threshold \
             RETURN p ORDER BY apoc.text.levenshteinSimilarity(p.title, $text) DESC, ID(p) ASC LIMIT 1 } \
             OPTIONAL MATCH (p)-[l:LINKS_TO]-(p2:Page) \
             RETURN p AS p1, l, p2",
        )
        .with("text", ParamValue::Text(text.to_string()))
        .with("threshold", ParamValue::Float(self.similarity_threshold))
    }

    pub fn find_path(&self, a: NodeId, b: NodeId) -> CypherQuery {
        // Variable-length bounds cannot be parameters in Cypher; the bound is a
        // settings integer, never user text.
        let text = format!(
            "MATCH (a:Page), (b:Page) WHERE ID(a) = $a AND ID(b) = $b \
             MATCH path = shortestPath((a)-[:LINKS_TO*..{}]-(b)) \
             RETURN path",
            self.max_path_hops
        );
        CypherQuery::new(QueryKind::ShortestPath, text)
            .with("a", ParamValue::Int(a))
            .with("b", ParamValue::Int(b))
            .with("max_hops", ParamValue::Int(self.max_path_hops as i64))
    }

    pub fn plan(&self, request: &GraphMutationRequest) -> PlannedMutation {
        match request {
            GraphMutationRequest::ExpandNodes(ids) => PlannedMutation::Update(self.expand_nodes(ids)),
            GraphMutationRequest::CreateFromSelection(ids) => {
                PlannedMutation::Render(self.create_from_selection(ids))
            }
            GraphMutationRequest::KeepOnly(ids) => PlannedMutation::Prune { keep: ids.clone() },
            GraphMutationRequest::DeleteSelection(ids) => PlannedMutation::Delete { ids: ids.clone() },
            GraphMutationRequest::FindPath(a, b) => PlannedMutation::Update(self.find_path(*a, *b)),
            GraphMutationRequest::SearchCreate(text) => PlannedMutation::Render(self.search(text)),
            GraphMutationRequest::SearchAppend(text) => PlannedMutation::Update(self.search(text)),
        }
    }
}
