use std::collections::BTreeSet;

use crate::graph_utils::graph::NodeId;

/// Selected node ids in engine order, with their display labels at the same
/// indices. Labels are a snapshot taken when the ids were last set; they are
/// recomputed from the engine on every update and never edited in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionStore {
    ids: Vec<NodeId>,
    labels: Vec<String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        SelectionStore::default()
    }

    /// Replace the selection. Duplicate ids keep their first position; ids the
    /// lookup no longer knows (deleted from the view) are dropped so that every
    /// id has a label.
    pub fn set_from_ids<F>(&mut self, ids: &[NodeId], lookup: F)
    where
        F: Fn(NodeId) -> Option<String>,
    {
        let mut seen = BTreeSet::new();
        let mut next_ids = Vec::with_capacity(ids.len());
        let mut next_labels = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(*id) {
                continue;
            }
            if let Some(label) = lookup(*id) {
                next_ids.push(*id);
                next_labels.push(label);
            }
        }
        self.ids = next_ids;
        self.labels = next_labels;
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.labels.clear();
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.ids.iter().copied().zip(self.labels.iter().map(String::as_str))
    }
}
