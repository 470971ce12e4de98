use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use anyhow::Result;

use crate::gql::query_builder::{GraphMutationRequest, QueryBuilder};
use crate::graph_utils::graph::{NodeId, Point};
use crate::persistence::settings::AppSettings;
use crate::render::port::{PointerEvent, RenderEvent, RenderPort};
use crate::wiki::client::ArticleService;
use crate::wiki::opener::Opener;
use super::alert::AlertState;
use super::context_menu::{ContextMenuController, ContextMenuState, MenuAction, MenuContext, MenuPhase};
use super::mutation::{self, Applied};
use super::selection::SelectionStore;
use super::summaries::{self, SummaryCollection};
use super::viewport::{ResizeListener, Viewport};

/// What a session call did.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionReport {
    // The engine has not signalled readiness; nothing happened
    Deferred,
    Mutated(Applied),
    Summaries {
        loaded: Vec<String>,
        // Labels whose article already had a summary
        skipped: Vec<String>,
        failed: Vec<(String, String)>,
    },
    Launched {
        opened: Vec<String>,
        failed: Vec<(String, String)>,
    },
    ImageOpened(PathBuf),
}

/// Owns one exploration session: selection, context menu, alert and
/// summaries, all driven by events from the rendering engine.
///
/// Engine events queue on a channel subscribed exactly once at mount; the
/// host calls [`SessionController::pump`] from its event loop to handle them.
/// Handlers read selection straight from `self`, so they always see the
/// latest value no matter when the subscription was made.
pub struct SessionController<R: RenderPort, A: ArticleService> {
    port: R,
    articles: A,
    opener: Box<dyn Opener>,
    builder: QueryBuilder,
    selection: SelectionStore,
    menu: ContextMenuController,
    alert: AlertState,
    summaries: SummaryCollection,
    subscribed: bool,
    events: Option<Receiver<RenderEvent>>,
    resize: Option<ResizeListener>,
    ready: bool,
    expanded: bool,
    compact_breakpoint: f32,
    summary_concurrency: usize,
}

impl<R: RenderPort, A: ArticleService> SessionController<R, A> {
    /// Subscribe to the engine, start listening for resizes and queue the
    /// initial render of `settings.initial_title`.
    pub fn mount(port: R, articles: A, opener: Box<dyn Opener>, viewport: &Viewport, settings: &AppSettings) -> Self {
        let compact = viewport.width() < settings.compact_breakpoint;
        let mut session = SessionController {
            port,
            articles,
            opener,
            builder: QueryBuilder::from_settings(settings),
            selection: SelectionStore::new(),
            menu: ContextMenuController::new(compact, settings.compact_menu_anchor),
            alert: AlertState::cleared(),
            summaries: SummaryCollection::new(),
            subscribed: false,
            events: None,
            resize: Some(viewport.listen()),
            ready: false,
            expanded: false,
            compact_breakpoint: settings.compact_breakpoint,
            summary_concurrency: settings.summary_concurrency.max(1),
        };
        session.ensure_subscribed();
        let initial = session.builder.title_expand(&settings.initial_title);
        session.port.render(&initial);
        log::info!("session mounted, initial page '{}'", settings.initial_title);
        session
    }

    /// Stop listening to the engine and the viewport.
    pub fn unmount(&mut self) {
        self.events = None;
        self.resize = None;
    }

    fn ensure_subscribed(&mut self) {
        if self.subscribed {
            return;
        }
        self.events = Some(self.port.subscribe());
        self.subscribed = true;
    }

    /// Handle every engine event and resize that arrived since the last call.
    /// Returns the number of engine events handled.
    pub fn pump(&mut self) -> usize {
        let events: Vec<RenderEvent> = match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        };
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        if let Some(width) = self.resize.as_ref().and_then(ResizeListener::latest) {
            self.apply_viewport_width(width);
        }
        count
    }

    fn handle_event(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::SelectionChanged(ids) => self.on_selection_changed(&ids),
            RenderEvent::Click(_) => self.on_click(),
            RenderEvent::DoubleClick(ev) => self.on_double_click(&ev),
            RenderEvent::ContextMenuRequested(ev) => self.on_context_menu(&ev),
            RenderEvent::RenderCompleted { cardinality } => self.on_render_completed(cardinality),
            RenderEvent::RenderFailed { message } => {
                self.mark_ready();
                log::warn!("render failed: {}", message);
            }
        }
    }

    fn on_selection_changed(&mut self, ids: &[NodeId]) {
        let port = &self.port;
        self.selection.set_from_ids(ids, |id| port.node_label(id));
        log::debug!("selection now {:?}", self.selection.labels());
    }

    fn on_click(&mut self) {
        self.menu.close();
        self.alert = AlertState::cleared();
    }

    fn on_double_click(&mut self, event: &PointerEvent) {
        if !self.ready {
            return;
        }
        if let Some(id) = event.nodes.first().copied() {
            log::debug!("double click expands {}", id);
            mutation::apply(&mut self.port, &self.builder, &GraphMutationRequest::ExpandNodes(vec![id]));
        }
    }

    fn on_context_menu(&mut self, event: &PointerEvent) {
        if !self.ready {
            return;
        }
        self.menu.context_click(&mut self.port, &mut self.selection, event);
    }

    fn on_render_completed(&mut self, cardinality: usize) {
        self.mark_ready();
        self.alert = AlertState::from_cardinality(cardinality);
        log::debug!("render completed with {} nodes", cardinality);
    }

    fn mark_ready(&mut self) {
        if !self.ready {
            log::info!("rendering engine ready");
            self.ready = true;
        }
    }

    // Compact layout follows the width; an open menu stays open
    fn apply_viewport_width(&mut self, width: f32) {
        let compact = width < self.compact_breakpoint;
        if self.menu.set_compact(compact) {
            log::debug!("viewport {}px, compact layout {}", width, compact);
        }
    }

    fn run(&mut self, request: GraphMutationRequest) -> ActionReport {
        if !self.ready {
            log::debug!("engine not ready, ignoring {:?}", request);
            return ActionReport::Deferred;
        }
        let applied = mutation::apply(&mut self.port, &self.builder, &request);
        match &applied {
            // Ids may be reassigned by a fresh render
            Applied::Rendered => self.selection.clear(),
            Applied::Removed(_) => {
                let ids = self.port.selected_node_ids();
                let port = &self.port;
                self.selection.set_from_ids(&ids, |id| port.node_label(id));
            }
            Applied::Updated => {}
        }
        ActionReport::Mutated(applied)
    }

    /// Search box "Create new graph".
    pub fn search_create(&mut self, text: &str) -> ActionReport {
        self.run(GraphMutationRequest::SearchCreate(text.to_string()))
    }

    /// Search box "Add to graph".
    pub fn search_append(&mut self, text: &str) -> ActionReport {
        let report = self.run(GraphMutationRequest::SearchAppend(text.to_string()));
        if report != ActionReport::Deferred {
            self.port.move_to(Point::ORIGIN);
        }
        report
    }

    pub fn stabilize(&mut self) {
        if self.ready {
            self.port.stabilize();
        }
    }

    pub fn center(&mut self) {
        if self.ready {
            self.port.fit_view();
        }
    }

    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// The menu button shown in compact layout.
    pub fn toggle_menu(&mut self) {
        self.menu.toggle(self.selection.len());
    }

    pub fn available_actions(&self) -> Vec<MenuAction> {
        self.menu.available_actions(self.selection.len())
    }

    /// Run a context-menu action. The menu is closed first, so it ends up
    /// closed whether or not the action succeeds.
    pub async fn execute(&mut self, action: MenuAction) -> Result<ActionReport> {
        let context = self.menu.effective_context(self.selection.len());
        self.menu.close();
        if !self.ready {
            log::debug!("engine not ready, ignoring {:?}", action);
            return Ok(ActionReport::Deferred);
        }
        if !action.is_offered(context, self.selection.len()) {
            anyhow::bail!("'{}' is not available here", action.label(context));
        }
        log::info!("menu action {:?} on {} node(s)", action, self.selection.len());

        if let Some(request) = action.mutation_request(&self.selection)? {
            return Ok(self.run(request));
        }
        match action {
            MenuAction::LoadSummaries => Ok(self.load_summaries().await),
            MenuAction::LaunchPages => Ok(self.launch_pages().await),
            MenuAction::OpenImage => {
                let path = self.port.capture_image()?;
                self.opener.open(&path.to_string_lossy())?;
                Ok(ActionReport::ImageOpened(path))
            }
            other => anyhow::bail!("no handler for {:?}", other),
        }
    }

    async fn load_summaries(&mut self) -> ActionReport {
        let labels = self.selection.labels().to_vec();
        let wanted = self.summaries.missing(&labels);
        let mut skipped: Vec<String> = labels.iter().filter(|l| self.summaries.contains(l)).cloned().collect();

        let results = summaries::fetch_summaries(&self.articles, &wanted, self.summary_concurrency).await;
        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for (label, res) in results {
            match res {
                Ok(summary) => {
                    let title = summary.title.clone();
                    if self.summaries.prepend(summary) {
                        loaded.push(title);
                    } else {
                        // Another label in this batch resolved to the same article
                        skipped.push(label);
                    }
                }
                Err(e) => {
                    log::warn!("summary for '{}' failed: {}", label, e);
                    failed.push((label, e.to_string()));
                }
            }
        }
        ActionReport::Summaries { loaded, skipped, failed }
    }

    async fn launch_pages(&mut self) -> ActionReport {
        let labels = self.selection.labels().to_vec();
        let results = summaries::fetch_links(&self.articles, &labels, self.summary_concurrency).await;
        let mut opened = Vec::new();
        let mut failed = Vec::new();
        for (label, res) in results {
            let outcome = match res {
                Ok(url) => self.opener.open(&url).map(|_| url),
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(url) => opened.push(url),
                Err(e) => {
                    log::warn!("launching '{}' failed: {}", label, e);
                    failed.push((label, e.to_string()));
                }
            }
        }
        ActionReport::Launched { opened, failed }
    }

    pub fn select_summary(&mut self, title: &str) -> bool {
        self.summaries.select(title)
    }

    pub fn close_summary(&mut self, title: &str) -> bool {
        self.summaries.close(title)
    }

    pub fn summaries(&self) -> &SummaryCollection {
        &self.summaries
    }

    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    pub fn menu_state(&self) -> &ContextMenuState {
        self.menu.state()
    }

    pub fn menu_phase(&self) -> MenuPhase {
        self.menu.phase()
    }

    pub fn menu_context(&self) -> MenuContext {
        self.menu.state().context
    }

    pub fn alert(&self) -> AlertState {
        self.alert
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn port(&self) -> &R {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut R {
        &mut self.port
    }
}
