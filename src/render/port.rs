use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::gql::query_builder::CypherQuery;
use crate::graph_utils::graph::{NodeId, Point};

#[derive(Clone, Debug, PartialEq)]
pub struct PointerEvent {
    // Pointer position in client (viewport) coordinates
    pub client: Point,
    // Top-left corner of the canvas element's bounding box, client coordinates
    pub target_origin: Point,
    // Nodes the engine reports under the pointer; unreliable for right clicks
    pub nodes: Vec<NodeId>,
}

impl PointerEvent {
    /// Pointer position relative to the canvas element.
    pub fn canvas_position(&self) -> Point {
        self.client.relative_to(self.target_origin)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RenderEvent {
    SelectionChanged(Vec<NodeId>),
    Click(PointerEvent),
    DoubleClick(PointerEvent),
    ContextMenuRequested(PointerEvent),
    // One per finished render/update, in call order
    RenderCompleted { cardinality: usize },
    RenderFailed { message: String },
}

/// The only way into the rendering engine.
///
/// `render` and `update` return immediately; their outcome arrives later as a
/// [`RenderEvent::RenderCompleted`] (or `RenderFailed`) on every receiver handed
/// out by [`RenderPort::subscribe`]. Everything else acts synchronously on the
/// view as currently drawn. Points passed to `node_at` and `move_to` are in
/// canvas-element coordinates and graph coordinates respectively.
pub trait RenderPort {
    /// Register a new listener. Each call adds one more receiver, so callers
    /// must subscribe once per session.
    fn subscribe(&mut self) -> Receiver<RenderEvent>;

    fn render(&mut self, query: &CypherQuery);
    fn update(&mut self, query: &CypherQuery);

    fn stabilize(&mut self);
    fn fit_view(&mut self);
    fn move_to(&mut self, point: Point);

    fn selected_node_ids(&self) -> Vec<NodeId>;
    // Replaces the engine's selection without emitting a selection event
    fn select_nodes(&mut self, ids: &[NodeId]);
    fn node_at(&self, point: Point) -> Option<NodeId>;
    fn node_label(&self, id: NodeId) -> Option<String>;
    fn connected_nodes(&self, id: NodeId) -> Vec<NodeId>;
    fn all_node_ids(&self) -> Vec<NodeId>;

    fn delete_selected(&mut self);
    fn remove_nodes(&mut self, ids: &[NodeId]);

    /// Rasterize the current canvas and return where the image was written.
    fn capture_image(&mut self) -> anyhow::Result<PathBuf>;
}
