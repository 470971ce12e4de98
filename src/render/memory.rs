use std::collections::{BTreeSet, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::Result;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::gql::query_builder::CypherQuery;
use crate::gql::query_interface::{self, QueryOutcome};
use crate::graph_utils::clickstream::ClickstreamStore;
use crate::graph_utils::graph::{NodeId, Point, VisibleGraph};
use super::port::{PointerEvent, RenderEvent, RenderPort};

/// Anything that can answer the queries the builder produces.
pub trait GraphSource {
    fn run(&mut self, query: &CypherQuery) -> Result<QueryOutcome>;
}

impl GraphSource for ClickstreamStore {
    fn run(&mut self, query: &CypherQuery) -> Result<QueryOutcome> {
        query_interface::execute_query(self, query)
    }
}

/// Clickstream store that appends every query to the dated query log.
pub struct LoggedStore {
    pub store: ClickstreamStore,
    pub log_dir: PathBuf,
}

impl GraphSource for LoggedStore {
    fn run(&mut self, query: &CypherQuery) -> Result<QueryOutcome> {
        query_interface::execute_and_log(&self.store, query, Some(&self.log_dir))
    }
}

#[derive(Clone, Debug)]
enum PendingOp {
    Render(CypherQuery),
    Update(CypherQuery),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    // Graph coordinate shown at the canvas center
    pub position: Point,
    pub scale: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera { position: Point::ORIGIN, scale: 1.0 }
    }
}

/// A headless rendering engine. Queries queue up until [`MemoryRenderer::flush`]
/// runs them, which is when completion events fire, so callers observe the
/// same asynchronous contract a browser engine gives them.
pub struct MemoryRenderer<S: GraphSource> {
    source: S,
    view: VisibleGraph,
    selection: Vec<NodeId>,
    pending: VecDeque<PendingOp>,
    listeners: Vec<Sender<RenderEvent>>,
    camera: Camera,
    canvas_size: Point,
    // Client-space top-left of the canvas element
    canvas_origin: Point,
    stabilize_count: usize,
    export_dir: PathBuf,
}

impl<S: GraphSource> MemoryRenderer<S> {
    pub fn new(source: S, canvas_size: Point, export_dir: PathBuf) -> Self {
        MemoryRenderer {
            source,
            view: VisibleGraph::new(),
            selection: Vec::new(),
            pending: VecDeque::new(),
            listeners: Vec::new(),
            camera: Camera::default(),
            canvas_size,
            canvas_origin: Point::ORIGIN,
            stabilize_count: 0,
            export_dir,
        }
    }

    pub fn with_canvas_origin(mut self, origin: Point) -> Self {
        self.canvas_origin = origin;
        self
    }

    pub fn view(&self) -> &VisibleGraph {
        &self.view
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn canvas_origin(&self) -> Point {
        self.canvas_origin
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn stabilize_count(&self) -> usize {
        self.stabilize_count
    }

    /// Run every queued render/update in call order, emitting one completion
    /// (or failure) event each. Returns how many ran.
    pub fn flush(&mut self) -> usize {
        let mut ran = 0;
        while let Some(op) = self.pending.pop_front() {
            ran += 1;
            let (query, replace) = match &op {
                PendingOp::Render(q) => (q, true),
                PendingOp::Update(q) => (q, false),
            };
            match self.source.run(query) {
                Ok(outcome) => {
                    if replace {
                        self.view.clear();
                        self.selection.clear();
                    }
                    self.view.merge(&outcome.pages, &outcome.links);
                    log::debug!(
                        "{} finished: {} pages, {} links",
                        if replace { "render" } else { "update" },
                        outcome.pages.len(),
                        outcome.links.len()
                    );
                    self.emit(RenderEvent::RenderCompleted { cardinality: outcome.cardinality() });
                }
                Err(e) => {
                    log::warn!("query failed: {}", e);
                    self.emit(RenderEvent::RenderFailed { message: e.to_string() });
                }
            }
        }
        ran
    }

    /// Where `id` is drawn, in client coordinates.
    pub fn client_position(&self, id: NodeId) -> Option<Point> {
        let node = self.view.get_node(id)?;
        let canvas = self.graph_to_canvas(node.position);
        Some(Point::new(canvas.x + self.canvas_origin.x, canvas.y + self.canvas_origin.y))
    }

    // Plain click: selects the node under the pointer or clears the selection
    pub fn click(&mut self, client: Point) {
        let event = self.pointer_event(client);
        let next: Vec<NodeId> = event.nodes.first().copied().into_iter().collect();
        if next != self.selection {
            self.selection = next.clone();
            self.emit(RenderEvent::SelectionChanged(next));
        }
        self.emit(RenderEvent::Click(event));
    }

    // Long-press / cmd-click: toggles the node under the pointer in the selection
    pub fn multi_select_click(&mut self, client: Point) {
        let event = self.pointer_event(client);
        if let Some(id) = event.nodes.first().copied() {
            if let Some(pos) = self.selection.iter().position(|s| *s == id) {
                self.selection.remove(pos);
            } else {
                self.selection.push(id);
            }
            self.emit(RenderEvent::SelectionChanged(self.selection.clone()));
        }
        self.emit(RenderEvent::Click(event));
    }

    pub fn double_click(&mut self, client: Point) {
        let event = self.pointer_event(client);
        self.emit(RenderEvent::DoubleClick(event));
    }

    pub fn context_click(&mut self, client: Point) {
        let event = self.pointer_event(client);
        self.emit(RenderEvent::ContextMenuRequested(event));
    }

    fn pointer_event(&self, client: Point) -> PointerEvent {
        let nodes = self.node_at(client.relative_to(self.canvas_origin)).into_iter().collect();
        PointerEvent { client, target_origin: self.canvas_origin, nodes }
    }

    fn emit(&mut self, event: RenderEvent) {
        // Drop listeners whose receiver is gone
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn canvas_to_graph(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.canvas_size.x / 2.0) / self.camera.scale + self.camera.position.x,
            (p.y - self.canvas_size.y / 2.0) / self.camera.scale + self.camera.position.y,
        )
    }

    fn graph_to_canvas(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.camera.position.x) * self.camera.scale + self.canvas_size.x / 2.0,
            (p.y - self.camera.position.y) * self.camera.scale + self.canvas_size.y / 2.0,
        )
    }

    fn render_svg(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">\n",
            self.canvas_size.x, self.canvas_size.y
        ));
        for link in self.view.links() {
            let (Some(a), Some(b)) = (self.view.get_node(link.from), self.view.get_node(link.to)) else { continue };
            let (pa, pb) = (self.graph_to_canvas(a.position), self.graph_to_canvas(b.position));
            let width = 1.0 + ((link.quantity as f32) + 1.0).log10();
            out.push_str(&format!(
                "  <line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\" stroke=\"gray\" stroke-width=\"{:.1}\"/>\n",
                pa.x, pa.y, pb.x, pb.y, width
            ));
        }
        for node in self.view.nodes() {
            let p = self.graph_to_canvas(node.position);
            let r = node.radius() * self.camera.scale;
            let stroke = if self.selection.contains(&node.page.id) { "#a42a04" } else { "gray" };
            out.push_str(&format!(
                "  <circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.1}\" fill=\"lightgray\" stroke=\"{}\"/>\n",
                p.x, p.y, r, stroke
            ));
            out.push_str(&format!(
                "  <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{}</text>\n",
                p.x,
                p.y + r + 12.0,
                escape_xml(&node.page.title)
            ));
        }
        out.push_str("</svg>\n");
        out
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

impl<S: GraphSource> RenderPort for MemoryRenderer<S> {
    fn subscribe(&mut self) -> Receiver<RenderEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        rx
    }

    fn render(&mut self, query: &CypherQuery) {
        self.pending.push_back(PendingOp::Render(query.clone()));
    }

    fn update(&mut self, query: &CypherQuery) {
        self.pending.push_back(PendingOp::Update(query.clone()));
    }

    fn stabilize(&mut self) {
        self.stabilize_count += 1;
    }

    fn fit_view(&mut self) {
        let mut nodes = self.view.nodes();
        let Some(first) = nodes.next() else {
            self.camera = Camera::default();
            return;
        };
        let (mut min, mut max) = (first.position, first.position);
        for n in nodes {
            min = Point::new(min.x.min(n.position.x), min.y.min(n.position.y));
            max = Point::new(max.x.max(n.position.x), max.y.max(n.position.y));
        }
        let span_x = (max.x - min.x).max(1.0) + 80.0;
        let span_y = (max.y - min.y).max(1.0) + 80.0;
        let scale = (self.canvas_size.x / span_x).min(self.canvas_size.y / span_y).clamp(0.05, 2.0);
        self.camera = Camera {
            position: Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0),
            scale,
        };
    }

    fn move_to(&mut self, point: Point) {
        self.camera.position = point;
    }

    fn selected_node_ids(&self) -> Vec<NodeId> {
        self.selection.clone()
    }

    fn select_nodes(&mut self, ids: &[NodeId]) {
        let mut seen = BTreeSet::new();
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.view.contains(*id) && seen.insert(*id))
            .collect();
    }

    fn node_at(&self, point: Point) -> Option<NodeId> {
        self.view.node_at(self.canvas_to_graph(point))
    }

    fn node_label(&self, id: NodeId) -> Option<String> {
        self.view.label(id).map(str::to_string)
    }

    fn connected_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.view.neighbors(id)
    }

    fn all_node_ids(&self) -> Vec<NodeId> {
        self.view.node_ids()
    }

    fn delete_selected(&mut self) {
        for id in std::mem::take(&mut self.selection) {
            self.view.remove_node(id);
        }
    }

    fn remove_nodes(&mut self, ids: &[NodeId]) {
        for id in ids {
            self.view.remove_node(*id);
        }
        self.selection.retain(|s| !ids.contains(s));
    }

    fn capture_image(&mut self) -> Result<PathBuf> {
        fs::create_dir_all(&self.export_dir)?;
        let now = OffsetDateTime::now_utc();
        let fmt = format_description!("[year][month][day]_[hour][minute][second]");
        let stamp = now.format(fmt).unwrap_or_else(|_| "unknown".to_string());
        let path = self.export_dir.join(format!("wikigraph_{}.svg", stamp));
        let mut f = File::create(&path)?;
        f.write_all(self.render_svg().as_bytes())?;
        f.flush()?;
        Ok(path)
    }
}
