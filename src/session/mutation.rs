use std::collections::BTreeSet;

use crate::gql::query_builder::{GraphMutationRequest, PlannedMutation, QueryBuilder};
use crate::graph_utils::graph::{NodeId, Point};
use crate::render::port::RenderPort;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    // A replacing render was queued; selection ids are void from here on
    Rendered,
    // A merging update was queued
    Updated,
    // Nodes removed from the view right away
    Removed(Vec<NodeId>),
}

/// Carry out one request against the engine.
pub fn apply<R: RenderPort + ?Sized>(port: &mut R, builder: &QueryBuilder, request: &GraphMutationRequest) -> Applied {
    log::debug!("mutation {:?}", request);
    match builder.plan(request) {
        PlannedMutation::Render(query) => {
            port.render(&query);
            port.select_nodes(&[]);
            port.move_to(Point::ORIGIN);
            Applied::Rendered
        }
        PlannedMutation::Update(query) => {
            port.update(&query);
            Applied::Updated
        }
        PlannedMutation::Prune { keep } => {
            let keep: BTreeSet<NodeId> = keep.into_iter().collect();
            let doomed: Vec<NodeId> = port.all_node_ids().into_iter().filter(|id| !keep.contains(id)).collect();
            port.remove_nodes(&doomed);
            Applied::Removed(doomed)
        }
        PlannedMutation::Delete { ids } => Applied::Removed(delete_with_isolates(port, &ids)),
    }
}

// Delete `ids`, then drop every former neighbor that was left with no links.
// Only one hop is cleaned up.
fn delete_with_isolates<R: RenderPort + ?Sized>(port: &mut R, ids: &[NodeId]) -> Vec<NodeId> {
    let doomed: BTreeSet<NodeId> = ids.iter().copied().collect();
    let mut neighbors = BTreeSet::new();
    for id in &doomed {
        for n in port.connected_nodes(*id) {
            if !doomed.contains(&n) {
                neighbors.insert(n);
            }
        }
    }

    port.select_nodes(ids);
    port.delete_selected();

    let isolated: Vec<NodeId> = neighbors
        .into_iter()
        .filter(|n| port.connected_nodes(*n).is_empty())
        .collect();
    if !isolated.is_empty() {
        port.remove_nodes(&isolated);
    }

    let mut removed: Vec<NodeId> = doomed.into_iter().collect();
    removed.extend(isolated);
    removed
}
