#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::rc::Rc;

use wikigraph::graph_utils::clickstream::ClickstreamStore;
use wikigraph::graph_utils::graph::{NodeId, Point};
use wikigraph::persistence::settings::AppSettings;
use wikigraph::render::memory::MemoryRenderer;
use wikigraph::render::port::RenderPort;
use wikigraph::session::controller::SessionController;
use wikigraph::session::viewport::Viewport;
use wikigraph::wiki::client::{ArticleError, ArticleMatch, ArticleService};
use wikigraph::wiki::opener::Opener;

// Ids are handed out in order of first appearance among accepted rows:
// Universe 0, Galaxy 1, Star 2, Sun 3, Milky Way 4, Hermit 5, Cave 6.
pub const CLICKSTREAM: &str = "\
other-search,Universe,external,5000
Universe,Galaxy,link,300
Universe,Star,link,200
Galaxy,Universe,link,50
Star,Sun,link,120
Sun,Star,link,80
Galaxy,Milky Way,link,90
Hermit,Cave,link,4
other-empty,Galaxy,external,700
Comet,Universe,other,12
";

pub const CANVAS: Point = Point { x: 1300.0, y: 710.0 };
pub const CANVAS_ORIGIN: Point = Point { x: 100.0, y: 50.0 };

pub fn store() -> ClickstreamStore {
    let mut store = ClickstreamStore::from_csv_str(CLICKSTREAM).expect("fixture parses");
    store.add_page("Isolated");
    store
}

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wikigraph-test-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[derive(Default)]
pub struct ArticleLog {
    pub titles: Vec<String>,
    pub searches: Vec<String>,
    pub in_flight: usize,
    pub max_in_flight: usize,
}

/// Article service answering from memory. Labels in `missing` have no article;
/// labels in `aliases` resolve to another article's title.
#[derive(Clone, Default)]
pub struct FakeArticles {
    pub missing: BTreeSet<String>,
    pub aliases: BTreeMap<String, String>,
    pub log: Rc<RefCell<ArticleLog>>,
}

impl FakeArticles {
    pub fn without(labels: &[&str]) -> Self {
        FakeArticles { missing: labels.iter().map(|s| s.to_string()).collect(), ..Default::default() }
    }

    pub fn aliasing(pairs: &[(&str, &str)]) -> Self {
        FakeArticles {
            aliases: pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            ..Default::default()
        }
    }

    fn title(&self, page_id: u64) -> Result<String, ArticleError> {
        self.log
            .borrow()
            .titles
            .get(page_id as usize)
            .cloned()
            .ok_or(ArticleError::MissingPage(page_id))
    }
}

impl ArticleService for FakeArticles {
    async fn search(&self, query: &str) -> Result<ArticleMatch, ArticleError> {
        {
            let mut log = self.log.borrow_mut();
            log.searches.push(query.to_string());
            log.in_flight += 1;
            log.max_in_flight = log.max_in_flight.max(log.in_flight);
        }
        tokio::task::yield_now().await;
        let mut log = self.log.borrow_mut();
        log.in_flight -= 1;
        if self.missing.contains(query) {
            return Err(ArticleError::NoMatch(query.to_string()));
        }
        let title = self.aliases.get(query).cloned().unwrap_or_else(|| query.to_string());
        log.titles.push(title.clone());
        Ok(ArticleMatch { title, pageid: (log.titles.len() - 1) as u64 })
    }

    async fn extract(&self, page_id: u64) -> Result<String, ArticleError> {
        Ok(format!("{} is an article.", self.title(page_id)?))
    }

    async fn link(&self, page_id: u64) -> Result<String, ArticleError> {
        Ok(format!("https://en.wikipedia.org/wiki/{}", self.title(page_id)?.replace(' ', "_")))
    }
}

#[derive(Clone, Default)]
pub struct SharedOpener {
    pub opened: Rc<RefCell<Vec<String>>>,
    pub fail: bool,
}

impl Opener for SharedOpener {
    fn open(&mut self, target: &str) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("no browser available");
        }
        self.opened.borrow_mut().push(target.to_string());
        Ok(())
    }
}

pub type TestSession = SessionController<MemoryRenderer<ClickstreamStore>, FakeArticles>;

pub struct Fixture {
    pub session: TestSession,
    pub viewport: Viewport,
    pub articles: FakeArticles,
    pub opener: SharedOpener,
}

pub fn mount_with(export_dir: PathBuf, width: f32, articles: FakeArticles, opener: SharedOpener) -> Fixture {
    let port = MemoryRenderer::new(store(), CANVAS, export_dir).with_canvas_origin(CANVAS_ORIGIN);
    let viewport = Viewport::new(width);
    let settings = AppSettings::default();
    let session = SessionController::mount(port, articles.clone(), Box::new(opener.clone()), &viewport, &settings);
    Fixture { session, viewport, articles, opener }
}

/// Mounted session with the initial render already finished.
pub fn ready(name: &str) -> Fixture {
    let mut fx = mount_with(scratch_dir(name), 1300.0, FakeArticles::default(), SharedOpener::default());
    settle(&mut fx.session);
    fx
}

pub fn settle(session: &mut TestSession) {
    loop {
        session.port_mut().flush();
        session.pump();
        if session.port().pending_len() == 0 {
            break;
        }
    }
}

pub fn id_of(session: &TestSession, title: &str) -> NodeId {
    session
        .port()
        .view()
        .nodes()
        .find(|n| n.page.title == title)
        .map(|n| n.page.id)
        .unwrap_or_else(|| panic!("{} is not on the canvas", title))
}

pub fn at(session: &TestSession, title: &str) -> Point {
    let id = id_of(session, title);
    session.port().client_position(id).expect("node is drawn")
}

pub fn titles(session: &TestSession) -> Vec<String> {
    let mut out: Vec<String> = session.port().view().nodes().map(|n| n.page.title.clone()).collect();
    out.sort();
    out
}

pub fn linked(session: &TestSession, a: &str, b: &str) -> bool {
    let (a, b) = (id_of(session, a), id_of(session, b));
    session.port().connected_nodes(a).contains(&b)
}

// Somewhere far from every spiral position
pub const EMPTY_SPOT: Point = Point { x: 1350.0, y: 700.0 };
