use anyhow::{anyhow, bail, Result};

use crate::gql::query_builder::GraphMutationRequest;
use crate::graph_utils::graph::Point;
use crate::render::port::{PointerEvent, RenderPort};
use super::selection::SelectionStore;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MenuContext {
    #[default]
    Canvas,
    OneNode,
    ManyNodes,
}

impl MenuContext {
    pub fn for_selection_len(len: usize) -> Self {
        match len {
            0 => MenuContext::Canvas,
            1 => MenuContext::OneNode,
            _ => MenuContext::ManyNodes,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuPhase {
    Closed,
    OpenCanvas,
    OpenOneNode,
    OpenManyNodes,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MenuAction {
    CreateGraph,
    KeepSelected,
    ExpandLinks,
    DeleteNodes,
    FindPath,
    LoadSummaries,
    LaunchPages,
    OpenImage,
}

impl MenuAction {
    pub const ALL: [MenuAction; 8] = [
        MenuAction::CreateGraph,
        MenuAction::KeepSelected,
        MenuAction::ExpandLinks,
        MenuAction::DeleteNodes,
        MenuAction::FindPath,
        MenuAction::LoadSummaries,
        MenuAction::LaunchPages,
        MenuAction::OpenImage,
    ];

    pub fn label(self, context: MenuContext) -> &'static str {
        let many = context == MenuContext::ManyNodes;
        match self {
            MenuAction::CreateGraph => "Create new graph with selection",
            MenuAction::KeepSelected => if many { "Keep selected nodes" } else { "Keep selected node" },
            MenuAction::ExpandLinks => "Expand node links",
            MenuAction::DeleteNodes => if many { "Delete nodes" } else { "Delete node" },
            MenuAction::FindPath => "Find path between nodes",
            MenuAction::LoadSummaries => if many { "Load summaries from Wikipedia" } else { "Load summary from Wikipedia" },
            MenuAction::LaunchPages => if many { "Launch Wikipedia pages" } else { "Launch Wikipedia page" },
            MenuAction::OpenImage => "Open image in new tab",
        }
    }

    /// Short command name used by text front ends.
    pub fn command(self) -> &'static str {
        match self {
            MenuAction::CreateGraph => "create",
            MenuAction::KeepSelected => "keep",
            MenuAction::ExpandLinks => "expand",
            MenuAction::DeleteNodes => "delete",
            MenuAction::FindPath => "path",
            MenuAction::LoadSummaries => "summaries",
            MenuAction::LaunchPages => "launch",
            MenuAction::OpenImage => "image",
        }
    }

    pub fn from_command(s: &str) -> Option<Self> {
        MenuAction::ALL.into_iter().find(|a| a.command().eq_ignore_ascii_case(s.trim()))
    }

    /// Whether this action is offered for the given context and selection size.
    pub fn is_offered(self, context: MenuContext, selection_len: usize) -> bool {
        match (self, context) {
            (MenuAction::OpenImage, MenuContext::Canvas) => true,
            (MenuAction::OpenImage, _) | (_, MenuContext::Canvas) => false,
            (MenuAction::FindPath, _) => selection_len == 2,
            _ => selection_len > 0,
        }
    }

    /// The graph mutation behind a node action, or None for actions that do
    /// not touch the graph (summaries, launching pages, image export).
    pub fn mutation_request(self, selection: &SelectionStore) -> Result<Option<GraphMutationRequest>> {
        let ids = selection.ids().to_vec();
        let needs_selection = !matches!(self, MenuAction::OpenImage);
        if needs_selection && ids.is_empty() {
            bail!("'{}' needs at least one selected node", self.label(MenuContext::OneNode));
        }
        let req = match self {
            MenuAction::CreateGraph => Some(GraphMutationRequest::CreateFromSelection(ids)),
            MenuAction::KeepSelected => Some(GraphMutationRequest::KeepOnly(ids)),
            MenuAction::ExpandLinks => Some(GraphMutationRequest::ExpandNodes(ids)),
            MenuAction::DeleteNodes => Some(GraphMutationRequest::DeleteSelection(ids)),
            MenuAction::FindPath => match ids.as_slice() {
                [a, b] => Some(GraphMutationRequest::FindPath(*a, *b)),
                _ => return Err(anyhow!("finding a path needs exactly two selected nodes, got {}", ids.len())),
            },
            MenuAction::LoadSummaries | MenuAction::LaunchPages | MenuAction::OpenImage => None,
        };
        Ok(req)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContextMenuState {
    pub open: bool,
    pub context: MenuContext,
    pub anchor: Point,
    // Narrow-viewport layout; tracked separately from open/context
    pub compact: bool,
}

impl ContextMenuState {
    pub fn phase(&self) -> MenuPhase {
        if !self.open {
            return MenuPhase::Closed;
        }
        match self.context {
            MenuContext::Canvas => MenuPhase::OpenCanvas,
            MenuContext::OneNode => MenuPhase::OpenOneNode,
            MenuContext::ManyNodes => MenuPhase::OpenManyNodes,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContextMenuController {
    state: ContextMenuState,
    // Where the menu sits in compact layout, regardless of the pointer
    compact_anchor: Point,
}

impl ContextMenuController {
    pub fn new(compact: bool, compact_anchor: Point) -> Self {
        ContextMenuController {
            state: ContextMenuState { open: false, context: MenuContext::Canvas, anchor: Point::ORIGIN, compact },
            compact_anchor,
        }
    }

    pub fn state(&self) -> &ContextMenuState {
        &self.state
    }

    pub fn phase(&self) -> MenuPhase {
        self.state.phase()
    }

    pub fn close(&mut self) {
        self.state.open = false;
    }

    // Returns true when the layout actually flipped
    pub fn set_compact(&mut self, compact: bool) -> bool {
        if self.state.compact == compact {
            return false;
        }
        self.state.compact = compact;
        true
    }

    fn open(&mut self, context: MenuContext, pointer: Point) {
        self.state.open = true;
        self.state.context = context;
        self.state.anchor = if self.state.compact { self.compact_anchor } else { pointer };
    }

    /// Right click: select the node under the pointer (joining any existing
    /// selection), then open the menu for whatever ends up selected, or the
    /// canvas menu when the pointer is over empty space.
    pub fn context_click<R: RenderPort + ?Sized>(
        &mut self,
        port: &mut R,
        selection: &mut SelectionStore,
        event: &PointerEvent,
    ) -> MenuContext {
        // The engine's own hit list is not reliable for right clicks; sample
        // the corrected position instead.
        let position = event.canvas_position();
        let context = match port.node_at(position) {
            Some(id) => {
                if !selection.contains(id) {
                    let mut ids = selection.ids().to_vec();
                    ids.push(id);
                    port.select_nodes(&ids);
                }
                let ids = port.selected_node_ids();
                selection.set_from_ids(&ids, |nid| port.node_label(nid));
                if selection.len() > 1 { MenuContext::ManyNodes } else { MenuContext::OneNode }
            }
            None => MenuContext::Canvas,
        };
        log::debug!("context click at ({:.0}, {:.0}) -> {:?}", position.x, position.y, context);
        self.open(context, position);
        context
    }

    /// Menu button for layouts without right click: flip open/closed and take
    /// the context from the selection size alone.
    pub fn toggle(&mut self, selection_len: usize) {
        let context = MenuContext::for_selection_len(selection_len);
        if self.state.open {
            self.state.open = false;
            self.state.context = context;
        } else {
            let anchor = self.state.anchor;
            self.open(context, anchor);
        }
    }

    /// Context an action would run in: the open menu's, else the selection's.
    pub fn effective_context(&self, selection_len: usize) -> MenuContext {
        if self.state.open { self.state.context } else { MenuContext::for_selection_len(selection_len) }
    }

    pub fn available_actions(&self, selection_len: usize) -> Vec<MenuAction> {
        let context = self.effective_context(selection_len);
        MenuAction::ALL
            .into_iter()
            .filter(|a| a.is_offered(context, selection_len))
            .collect()
    }
}
