use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

// Page ids are the database's internal integer ids, the same ones the
// rendering engine keys its nodes by.
pub type NodeId = i64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Point { x, y }
    }

    /// Express this point relative to `origin` (e.g. a client-space pointer
    /// position relative to the canvas element's bounding box).
    pub fn relative_to(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: NodeId,
    pub title: String,
    // Total clicks into this page; drives node size
    pub weight: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    // Number of clicks from `from` to `to`; drives edge thickness and ordering
    pub quantity: u64,
}

#[derive(Clone, Debug)]
pub struct RenderedNode {
    pub page: Page,
    pub position: Point,
}

impl RenderedNode {
    pub fn radius(&self) -> f32 {
        node_radius(self.page.weight)
    }
}

pub fn node_radius(weight: u64) -> f32 {
    10.0 + ((weight as f32) + 1.0).log10() * 4.0
}

/// The graph currently drawn on the canvas. Pages and links only live here
/// until the next full render; nothing is written back to the database.
#[derive(Clone, Debug, Default)]
pub struct VisibleGraph {
    nodes: BTreeMap<NodeId, RenderedNode>,
    links: BTreeMap<(NodeId, NodeId), Link>,
    // Index along the placement spiral for the next new node
    placed: u32,
}

impl VisibleGraph {
    pub fn new() -> Self {
        VisibleGraph::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.placed = 0;
    }

    // Add a page if it is not drawn yet; returns true when it was new
    pub fn upsert_page(&mut self, page: Page) -> bool {
        if let Some(existing) = self.nodes.get_mut(&page.id) {
            existing.page = page;
            return false;
        }
        let position = golden_spiral_position(Point::ORIGIN, self.placed);
        self.placed += 1;
        self.nodes.insert(page.id, RenderedNode { page, position });
        true
    }

    // Add a link if both ends are drawn; duplicates are collapsed by endpoint pair
    pub fn add_link(&mut self, link: Link) -> bool {
        if !self.nodes.contains_key(&link.from) || !self.nodes.contains_key(&link.to) {
            return false;
        }
        self.links.insert((link.from, link.to), link);
        true
    }

    pub fn merge(&mut self, pages: &[Page], links: &[Link]) {
        for page in pages {
            self.upsert_page(page.clone());
        }
        for link in links {
            self.add_link(link.clone());
        }
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_some() {
            // Cascade delete links touching this node
            self.links.retain(|(from, to), _| *from != id && *to != id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&RenderedNode> {
        self.nodes.get(&id)
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.page.title.as_str())
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RenderedNode> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // Nodes sharing a link with `id` in either direction, without duplicates
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = BTreeSet::new();
        for (from, to) in self.links.keys() {
            if *from == id && *to != id {
                out.insert(*to);
            } else if *to == id && *from != id {
                out.insert(*from);
            }
        }
        out.into_iter().collect()
    }

    /// Topmost node whose disc contains `point` (canvas coordinates). When discs
    /// overlap the closest center wins.
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.nodes
            .values()
            .filter_map(|n| {
                let d = n.position.distance(point);
                if d <= n.radius() { Some((n.page.id, d)) } else { None }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}

// Golden-angle spiral placement around the provided center.
// k is the 0-based index along the spiral.
fn golden_spiral_position(center: Point, k: u32) -> Point {
    let golden_angle = std::f32::consts::TAU * (1.0 - 1.0 / 1.618_033_9);
    let t = k as f32;
    let base = 60.0;
    let r = base * t.sqrt();
    let theta = t * golden_angle;
    Point::new(center.x + r * theta.cos(), center.y + r * theta.sin())
}
