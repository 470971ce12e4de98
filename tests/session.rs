mod common;

use wikigraph::graph_utils::graph::Point;
use wikigraph::render::port::RenderPort;
use wikigraph::session::alert::AlertKind;
use wikigraph::session::context_menu::{MenuAction, MenuContext, MenuPhase};
use wikigraph::session::controller::ActionReport;
use wikigraph::session::mutation::Applied;

use common::*;

#[test]
fn mount_subscribes_once_and_queues_initial_render() {
    let mut fx = mount_with(scratch_dir("mount"), 1300.0, FakeArticles::default(), SharedOpener::default());
    assert_eq!(fx.session.port().listener_count(), 1);
    assert_eq!(fx.session.port().pending_len(), 1);
    assert!(!fx.session.is_ready());

    settle(&mut fx.session);
    fx.session.pump();
    assert!(fx.session.is_ready());
    assert_eq!(fx.session.port().listener_count(), 1);
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Star", "Universe"]);
    assert!(!fx.session.alert().is_shown());
}

#[tokio::test]
async fn actions_before_ready_are_deferred() {
    let mut fx = mount_with(scratch_dir("deferred"), 1300.0, FakeArticles::default(), SharedOpener::default());
    assert_eq!(fx.session.search_create("Galaxy"), ActionReport::Deferred);
    assert_eq!(fx.session.search_append("Galaxy"), ActionReport::Deferred);
    let report = fx.session.execute(MenuAction::OpenImage).await.expect("deferred is not an error");
    assert_eq!(report, ActionReport::Deferred);
    // Only the initial render was queued
    assert_eq!(fx.session.port().pending_len(), 1);
}

#[test]
fn fuzzy_search_renders_best_match_with_links() {
    let mut fx = ready("search");
    assert_eq!(fx.session.search_create("Univers"), ActionReport::Mutated(Applied::Rendered));
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Star", "Universe"]);
    assert!(linked(&fx.session, "Universe", "Star"));
    assert_eq!(fx.session.port().camera().position, Point::ORIGIN);
    assert!(fx.session.selection().is_empty());
}

#[test]
fn search_append_merges_and_recenters() {
    let mut fx = ready("append");
    fx.session.port_mut().fit_view();
    assert_ne!(fx.session.port().camera().position, Point::ORIGIN);

    assert_eq!(fx.session.search_append("Sun"), ActionReport::Mutated(Applied::Updated));
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Star", "Sun", "Universe"]);
    assert_eq!(fx.session.port().camera().position, Point::ORIGIN);
}

#[test]
fn empty_search_raises_alert_until_clicked() {
    let mut fx = ready("no-match");
    fx.session.search_create("Quasar");
    settle(&mut fx.session);
    assert_eq!(fx.session.port().view().node_count(), 0);
    assert!(fx.session.alert().is_shown());
    assert_eq!(fx.session.alert().kind(), AlertKind::NoMatchFound);
    assert!(fx.session.alert().message().is_some());

    fx.session.port_mut().click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert!(!fx.session.alert().is_shown());
}

#[test]
fn new_search_with_results_clears_previous_alert() {
    let mut fx = ready("alert-reset");
    fx.session.search_create("Quasar");
    settle(&mut fx.session);
    assert_eq!(fx.session.alert().kind(), AlertKind::NoMatchFound);

    // No click in between; the next completed render decides the alert
    fx.session.search_create("Universe");
    settle(&mut fx.session);
    assert!(fx.session.port().view().node_count() > 0);
    assert!(!fx.session.alert().is_shown());
    assert_eq!(fx.session.alert().kind(), AlertKind::None);
}

#[test]
fn selection_labels_track_ids() {
    let mut fx = ready("selection");
    let galaxy = at(&fx.session, "Galaxy");
    let star = at(&fx.session, "Star");

    fx.session.port_mut().click(galaxy);
    settle(&mut fx.session);
    assert_eq!(fx.session.selection().ids(), &[id_of(&fx.session, "Galaxy")]);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string()]);

    fx.session.port_mut().multi_select_click(star);
    settle(&mut fx.session);
    assert_eq!(fx.session.selection().len(), 2);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string(), "Star".to_string()]);

    fx.session.port_mut().click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert!(fx.session.selection().is_empty());
    assert!(fx.session.selection().labels().is_empty());
}

#[test]
fn right_click_on_node_selects_it_and_opens_one_node_menu() {
    let mut fx = ready("rclick-one");
    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().context_click(galaxy);
    settle(&mut fx.session);

    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenOneNode);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string()]);
    assert_eq!(fx.session.menu_state().anchor, galaxy.relative_to(CANVAS_ORIGIN));

    let actions = fx.session.available_actions();
    assert!(actions.contains(&MenuAction::ExpandLinks));
    assert!(!actions.contains(&MenuAction::FindPath));
    assert!(!actions.contains(&MenuAction::OpenImage));
}

#[test]
fn right_click_joins_existing_selection() {
    let mut fx = ready("rclick-many");
    let galaxy = at(&fx.session, "Galaxy");
    let star = at(&fx.session, "Star");
    let universe = at(&fx.session, "Universe");

    fx.session.port_mut().click(galaxy);
    fx.session.port_mut().context_click(star);
    settle(&mut fx.session);
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenManyNodes);
    assert_eq!(fx.session.selection().len(), 2);
    assert!(fx.session.available_actions().contains(&MenuAction::FindPath));
    assert_eq!(MenuAction::DeleteNodes.label(fx.session.menu_context()), "Delete nodes");

    fx.session.port_mut().context_click(universe);
    settle(&mut fx.session);
    assert_eq!(fx.session.selection().len(), 3);
    assert!(!fx.session.available_actions().contains(&MenuAction::FindPath));
}

#[test]
fn right_click_on_selected_node_keeps_selection() {
    let mut fx = ready("rclick-selected");
    let galaxy = at(&fx.session, "Galaxy");
    let star = at(&fx.session, "Star");

    fx.session.port_mut().click(galaxy);
    fx.session.port_mut().multi_select_click(star);
    settle(&mut fx.session);
    assert_eq!(fx.session.selection().len(), 2);

    fx.session.port_mut().context_click(star);
    settle(&mut fx.session);
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenManyNodes);
    assert_eq!(fx.session.selection().len(), 2);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string(), "Star".to_string()]);
}

#[test]
fn right_click_on_canvas_offers_only_image() {
    let mut fx = ready("rclick-canvas");
    fx.session.port_mut().context_click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenCanvas);
    assert_eq!(fx.session.available_actions(), vec![MenuAction::OpenImage]);

    fx.session.port_mut().click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);
}

#[test]
fn find_path_is_offered_only_for_two_nodes() {
    for (len, offered) in [(1, false), (2, true), (3, false)] {
        assert_eq!(MenuAction::FindPath.is_offered(MenuContext::for_selection_len(len), len), offered);
    }
    assert!(!MenuAction::FindPath.is_offered(MenuContext::Canvas, 0));
}

#[tokio::test]
async fn find_path_adds_connecting_links() {
    let mut fx = ready("path");
    fx.session.search_create("Milky Way");
    settle(&mut fx.session);
    fx.session.search_append("Star");
    settle(&mut fx.session);
    assert!(!linked(&fx.session, "Galaxy", "Universe"));

    let (mw, star) = (at(&fx.session, "Milky Way"), at(&fx.session, "Star"));
    fx.session.port_mut().click(mw);
    fx.session.port_mut().context_click(star);
    settle(&mut fx.session);

    let report = fx.session.execute(MenuAction::FindPath).await.expect("path runs");
    assert_eq!(report, ActionReport::Mutated(Applied::Updated));
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);
    settle(&mut fx.session);
    assert!(linked(&fx.session, "Galaxy", "Universe"));
}

#[tokio::test]
async fn delete_removes_newly_isolated_neighbors() {
    let mut fx = ready("delete");
    fx.session.search_create("Star");
    settle(&mut fx.session);
    fx.session.search_append("Galaxy");
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Milky Way", "Star", "Sun", "Universe"]);

    let star_id = id_of(&fx.session, "Star");
    let sun_id = id_of(&fx.session, "Sun");
    let star = at(&fx.session, "Star");
    fx.session.port_mut().context_click(star);
    settle(&mut fx.session);

    let report = fx.session.execute(MenuAction::DeleteNodes).await.expect("delete runs");
    assert_eq!(report, ActionReport::Mutated(Applied::Removed(vec![star_id, sun_id])));
    // Universe keeps its link to Galaxy
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Milky Way", "Universe"]);
    assert!(fx.session.selection().is_empty());
}

#[tokio::test]
async fn keep_selected_prunes_everything_else() {
    let mut fx = ready("keep");
    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().context_click(galaxy);
    settle(&mut fx.session);

    let report = fx.session.execute(MenuAction::KeepSelected).await.expect("keep runs");
    assert!(matches!(report, ActionReport::Mutated(Applied::Removed(ref ids)) if ids.len() == 2));
    assert_eq!(titles(&fx.session), vec!["Galaxy"]);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string()]);
}

#[tokio::test]
async fn expand_links_merges_neighbors() {
    let mut fx = ready("expand");
    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().context_click(galaxy);
    settle(&mut fx.session);

    fx.session.execute(MenuAction::ExpandLinks).await.expect("expand runs");
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Milky Way", "Star", "Universe"]);
    assert_eq!(fx.session.selection().labels(), &["Galaxy".to_string()]);
}

#[tokio::test]
async fn create_graph_replaces_view_and_clears_selection() {
    let mut fx = ready("create");
    let star = at(&fx.session, "Star");
    fx.session.port_mut().context_click(star);
    settle(&mut fx.session);

    let report = fx.session.execute(MenuAction::CreateGraph).await.expect("create runs");
    assert_eq!(report, ActionReport::Mutated(Applied::Rendered));
    assert!(fx.session.selection().is_empty());
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), vec!["Star", "Sun", "Universe"]);
}

#[test]
fn double_click_expands_node() {
    let mut fx = ready("dblclick");
    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().double_click(galaxy);
    settle(&mut fx.session);
    assert!(titles(&fx.session).contains(&"Milky Way".to_string()));
}

#[test]
fn double_click_on_dead_end_keeps_graph_and_alerts() {
    let mut fx = ready("dead-end");
    fx.session.search_append("Isolated");
    settle(&mut fx.session);
    fx.session.port_mut().click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert!(!fx.session.alert().is_shown());
    let before = titles(&fx.session);

    let isolated = at(&fx.session, "Isolated");
    fx.session.port_mut().double_click(isolated);
    settle(&mut fx.session);
    assert_eq!(titles(&fx.session), before);
    assert_eq!(fx.session.alert().kind(), AlertKind::DeadEnd);
    assert!(fx.session.alert().is_shown());
}

#[tokio::test]
async fn open_image_writes_svg_and_closes_menu() {
    let mut fx = ready("image");
    fx.session.port_mut().context_click(EMPTY_SPOT);
    settle(&mut fx.session);

    let report = fx.session.execute(MenuAction::OpenImage).await.expect("export works");
    let ActionReport::ImageOpened(path) = report else { panic!("unexpected report {:?}", report) };
    let svg = std::fs::read_to_string(&path).expect("svg written");
    assert!(svg.contains("<svg"));
    assert!(svg.contains(">Universe</text>"));
    assert_eq!(fx.opener.opened.borrow().as_slice(), &[path.to_string_lossy().to_string()]);
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);
}

#[tokio::test]
async fn open_image_failure_still_closes_menu() {
    // A regular file where the export directory should be
    let dir = scratch_dir("image-fail");
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, b"x").expect("write blocker");

    let mut fx = mount_with(blocker.join("exports"), 1300.0, FakeArticles::default(), SharedOpener::default());
    settle(&mut fx.session);
    fx.session.port_mut().context_click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert!(fx.session.menu_state().open);

    assert!(fx.session.execute(MenuAction::OpenImage).await.is_err());
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);
    assert!(fx.opener.opened.borrow().is_empty());
}

#[tokio::test]
async fn open_image_opener_failure_closes_menu() {
    let opener = SharedOpener { fail: true, ..Default::default() };
    let mut fx = mount_with(scratch_dir("image-opener"), 1300.0, FakeArticles::default(), opener);
    settle(&mut fx.session);
    fx.session.port_mut().context_click(EMPTY_SPOT);
    settle(&mut fx.session);

    assert!(fx.session.execute(MenuAction::OpenImage).await.is_err());
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);
}

#[tokio::test]
async fn node_actions_are_refused_on_canvas_menu() {
    let mut fx = ready("refused");
    fx.session.port_mut().context_click(EMPTY_SPOT);
    settle(&mut fx.session);
    assert!(fx.session.execute(MenuAction::DeleteNodes).await.is_err());
    assert_eq!(titles(&fx.session), vec!["Galaxy", "Star", "Universe"]);
}

#[test]
fn resize_flips_layout_without_touching_menu() {
    let mut fx = ready("resize");
    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().context_click(galaxy);
    settle(&mut fx.session);
    assert!(!fx.session.menu_state().compact);

    fx.viewport.resize(800.0);
    fx.session.pump();
    let state = *fx.session.menu_state();
    assert!(state.compact);
    assert!(state.open);
    assert_eq!(state.context, MenuContext::OneNode);

    fx.viewport.resize(1250.0);
    fx.session.pump();
    assert!(!fx.session.menu_state().compact);
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenOneNode);
}

#[test]
fn compact_layout_anchors_menu_at_fixed_corner() {
    let mut fx = mount_with(scratch_dir("compact"), 900.0, FakeArticles::default(), SharedOpener::default());
    settle(&mut fx.session);
    assert!(fx.session.menu_state().compact);

    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().context_click(galaxy);
    settle(&mut fx.session);
    assert_eq!(fx.session.menu_state().anchor, Point::new(16.0, 16.0));
}

#[test]
fn menu_button_toggles_by_selection_size() {
    let mut fx = ready("toggle");
    fx.session.toggle_menu();
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenCanvas);
    fx.session.toggle_menu();
    assert_eq!(fx.session.menu_phase(), MenuPhase::Closed);

    let galaxy = at(&fx.session, "Galaxy");
    fx.session.port_mut().click(galaxy);
    settle(&mut fx.session);
    fx.session.toggle_menu();
    assert_eq!(fx.session.menu_phase(), MenuPhase::OpenOneNode);
}

#[test]
fn unmount_and_drop_release_listeners() {
    let mut fx = ready("unmount");
    assert_eq!(fx.viewport.listener_count(), 1);
    fx.session.unmount();
    assert_eq!(fx.viewport.listener_count(), 0);

    // Events after unmount go nowhere
    fx.session.port_mut().click(EMPTY_SPOT);
    assert_eq!(fx.session.pump(), 0);

    let other = mount_with(scratch_dir("unmount-drop"), 1300.0, FakeArticles::default(), SharedOpener::default());
    assert_eq!(other.viewport.listener_count(), 1);
    let viewport = other.viewport.clone();
    drop(other);
    assert_eq!(viewport.listener_count(), 0);
}

#[test]
fn layout_controls() {
    let mut fx = ready("layout");
    fx.session.stabilize();
    assert_eq!(fx.session.port().stabilize_count(), 1);

    fx.session.center();
    assert_ne!(fx.session.port().camera().position, Point::ORIGIN);

    assert!(!fx.session.is_expanded());
    assert!(fx.session.toggle_expanded());
    assert!(!fx.session.toggle_expanded());
}
