// wikigraph: terminal front end for a clickstream exploration session
// Build with: cargo build --features cli --bin wikigraph

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use wikigraph::graph_utils::clickstream::ClickstreamStore;
use wikigraph::graph_utils::graph::{NodeId, Point};
use wikigraph::persistence::settings::AppSettings;
use wikigraph::render::memory::{LoggedStore, MemoryRenderer};
use wikigraph::session::context_menu::MenuAction;
use wikigraph::session::controller::{ActionReport, SessionController};
use wikigraph::session::mutation::Applied;
use wikigraph::session::viewport::Viewport;
use wikigraph::wiki::client::WikipediaClient;
use wikigraph::wiki::opener::LogOpener;

type Session = SessionController<MemoryRenderer<LoggedStore>, WikipediaClient>;

const CANVAS_SIZE: Point = Point { x: 1300.0, y: 710.0 };

const HELP: &str = "Commands:
  search <text>        Replace the graph with the best title match and its links
  append <text>        Add the best title match and its links to the graph
  click <x> <y|title>  Left click at client coordinates, or on a node by title
  mclick <x> <y|title> Add/remove the node under the pointer from the selection
  dblclick <...>       Double click (expands the node under the pointer)
  rclick <...>         Right click (opens the context menu)
  menu                 Toggle the compact menu button
  actions              List actions offered right now
  do <action>          Run an action: create keep expand delete path summaries launch image
  nodes                List visible nodes with their client positions
  selection            Show the current selection
  summaries [title]    Show loaded summaries, switching to <title> if given
  close <title>        Close a summary tab
  stabilize | center   Layout controls
  resize <width>       Resize the viewport
  expand               Toggle the expanded panel
  help | ?             Show this help
  quit | exit          Leave";

fn settings_dir() -> PathBuf {
    AppSettings::settings_dir()
}

// Run queued renders and hand their events to the session until both are idle
fn settle(session: &mut Session) {
    loop {
        session.port_mut().flush();
        session.pump();
        if session.port().pending_len() == 0 {
            break;
        }
    }
    if let Some(msg) = session.alert().message() {
        println!("! {}", msg);
    }
}

// "<x> <y>" in client coordinates, or a node title
fn pointer_target(session: &Session, args: &str) -> Option<Point> {
    let mut parts = args.split_whitespace();
    if let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) {
        if let (Ok(x), Ok(y)) = (x.parse::<f32>(), y.parse::<f32>()) {
            return Some(Point::new(x, y));
        }
    }
    let view = session.port().view();
    let id: NodeId = view
        .nodes()
        .find(|n| n.page.title.eq_ignore_ascii_case(args.trim()))
        .map(|n| n.page.id)?;
    session.port().client_position(id)
}

fn print_report(report: &ActionReport) {
    match report {
        ActionReport::Deferred => println!("(graph is still loading)"),
        ActionReport::Mutated(Applied::Rendered) => println!("graph replaced"),
        ActionReport::Mutated(Applied::Updated) => println!("graph updated"),
        ActionReport::Mutated(Applied::Removed(ids)) => println!("removed {} node(s)", ids.len()),
        ActionReport::Summaries { loaded, skipped, failed } => {
            for t in loaded {
                println!("loaded summary: {}", t);
            }
            if !skipped.is_empty() {
                println!("already loaded: {}", skipped.join(", "));
            }
            for (label, err) in failed {
                eprintln!("summary for {} failed: {}", label, err);
            }
        }
        ActionReport::Launched { opened, failed } => {
            for url in opened {
                println!("open {}", url);
            }
            for (label, err) in failed {
                eprintln!("launching {} failed: {}", label, err);
            }
        }
        ActionReport::ImageOpened(path) => println!("image written to {}", path.display()),
    }
}

fn print_nodes(session: &Session) {
    let view = session.port().view();
    for node in view.nodes() {
        let pos = session.port().client_position(node.page.id).unwrap_or(Point::ORIGIN);
        let mark = if session.selection().contains(node.page.id) { "*" } else { " " };
        println!("{} {:>6}  {:<40} ({:.0}, {:.0})  weight {}", mark, node.page.id, node.page.title, pos.x, pos.y, node.page.weight);
    }
    println!("{} node(s), {} link(s)", view.node_count(), view.link_count());
}

fn print_summaries(session: &Session) {
    let summaries = session.summaries();
    if summaries.is_empty() {
        println!("no summaries loaded");
        return;
    }
    let current = summaries.current().map(|s| s.title.as_str());
    for s in summaries.entries() {
        let mark = if Some(s.title.as_str()) == current { ">" } else { " " };
        println!("{} {}", mark, s.title);
    }
    if let Some(s) = summaries.current() {
        println!("\n{}\n{}", s.title, s.text);
    }
}

async fn handle_line(session: &mut Session, viewport: &Viewport, line: &str) -> bool {
    let (cmd, args) = match line.split_once(char::is_whitespace) {
        Some((c, a)) => (c.to_ascii_lowercase(), a.trim()),
        None => (line.to_ascii_lowercase(), ""),
    };
    match cmd.as_str() {
        "quit" | "exit" | ":quit" => return false,
        "help" | "?" | ":help" => println!("{}", HELP),
        "search" | "append" if args.is_empty() => eprintln!("usage: {} <text>", cmd),
        "search" => print_report(&session.search_create(args)),
        "append" => print_report(&session.search_append(args)),
        "click" | "mclick" | "dblclick" | "rclick" => match pointer_target(session, args) {
            Some(p) => {
                let port = session.port_mut();
                match cmd.as_str() {
                    "click" => port.click(p),
                    "mclick" => port.multi_select_click(p),
                    "dblclick" => port.double_click(p),
                    _ => port.context_click(p),
                }
            }
            None => eprintln!("no such point or node: {}", args),
        },
        "menu" => session.toggle_menu(),
        "actions" => {}
        "do" => match MenuAction::from_command(args) {
            Some(action) => match session.execute(action).await {
                Ok(report) => print_report(&report),
                Err(e) => eprintln!("error: {}", e),
            },
            None => eprintln!("unknown action '{}'", args),
        },
        "nodes" => print_nodes(session),
        "selection" => {
            if session.selection().is_empty() {
                println!("nothing selected");
            }
            for (id, label) in session.selection().iter() {
                println!("{:>6}  {}", id, label);
            }
        }
        "summaries" => {
            if !args.is_empty() && !session.select_summary(args) {
                eprintln!("no summary titled '{}'", args);
            }
            print_summaries(session);
        }
        "close" => {
            if !session.close_summary(args) {
                eprintln!("no summary titled '{}'", args);
            }
        }
        "stabilize" => session.stabilize(),
        "center" => session.center(),
        "resize" => match args.parse::<f32>() {
            Ok(w) => viewport.resize(w),
            Err(_) => eprintln!("usage: resize <width>"),
        },
        "expand" => println!("expanded: {}", session.toggle_expanded()),
        other => eprintln!("unknown command '{}', try help", other),
    }
    settle(session);

    let menu = session.menu_state();
    if menu.open {
        let names: Vec<&str> = session.available_actions().into_iter().map(|a| a.label(menu.context)).collect();
        println!("[menu {:?}{}] {}", menu.context, if menu.compact { ", compact" } else { "" }, names.join(" | "));
    } else if cmd == "actions" {
        let names: Vec<&str> = session.available_actions().into_iter().map(MenuAction::command).collect();
        println!("{}", names.join(" "));
    }
    true
}

fn build_session(data: &str, settings: &AppSettings, viewport: &Viewport) -> anyhow::Result<Session> {
    let store = ClickstreamStore::load_csv(std::path::Path::new(data))?;
    let source = LoggedStore { store, log_dir: settings.query_log_dir() };
    let port = MemoryRenderer::new(source, CANVAS_SIZE, settings.export_dir());
    let articles = WikipediaClient::new(settings.wikipedia_endpoint.clone())?;
    let mut session = SessionController::mount(port, articles, Box::new(LogOpener::new()), viewport, settings);
    settle(&mut session);
    Ok(session)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();
    let matches = Command::new("wikigraph")
        .about("Explore the Wikipedia clickstream graph from the terminal")
        .arg(Arg::new("data").long("data").value_name("CSV").required(true).help("Clickstream export (prev,curr,type,n rows)"))
        .arg(Arg::new("settings").long("settings").value_name("FILE").help("Settings file to use instead of the per-user one"))
        .arg(Arg::new("width").long("width").value_name("PX").default_value("1300").help("Initial viewport width"))
        .arg(Arg::new("eval").short('e').long("eval").value_name("COMMAND").action(ArgAction::Append).help("Run a command and exit; may repeat"))
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).help("Suppress banner/help text"))
        .get_matches();

    let settings = match matches.get_one::<String>("settings") {
        Some(p) => AppSettings::load_from(std::path::Path::new(p)),
        None => AppSettings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to load settings: {}", e);
            std::process::exit(1);
        }
    };
    let width = matches
        .get_one::<String>("width")
        .and_then(|w| w.parse::<f32>().ok())
        .unwrap_or(CANVAS_SIZE.x);
    let viewport = Viewport::new(width);
    let data = matches.get_one::<String>("data").cloned().unwrap_or_default();
    let mut session = match build_session(&data, &settings, &viewport) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to start session: {}", e);
            std::process::exit(2);
        }
    };
    let quiet = matches.get_flag("quiet");

    // One-off eval mode
    if let Some(cmds) = matches.get_many::<String>("eval") {
        for cmd in cmds {
            if !handle_line(&mut session, &viewport, cmd.trim()).await {
                break;
            }
        }
        session.unmount();
        return;
    }

    let mut rl: Editor<(), DefaultHistory> = match Editor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("failed to initialize editor: {}", e);
            std::process::exit(1);
        }
    };
    let mut hist_path = settings_dir();
    hist_path.push("wikigraph_history.txt");
    let _ = std::fs::create_dir_all(settings_dir());
    let _ = rl.load_history(&hist_path);

    if !quiet {
        eprintln!(
            "Loaded {} with '{}' on screen ({} nodes).\nType help for commands. History saved at {}.\n",
            data,
            settings.initial_title,
            session.port().view().node_count(),
            hist_path.display()
        );
    }

    loop {
        match rl.readline("wikigraph> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                rl.add_history_entry(input).ok();
                if !handle_line(&mut session, &viewport, input).await {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }
    let _ = rl.save_history(&hist_path);
    session.unmount();
}
