use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::graph_utils::graph::Point;

/// Connection details for the graph-database collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
            uri: Self::default_uri(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl DatabaseSettings {
    fn default_name() -> String { "neo4j".to_string() }
    fn default_uri() -> String { "neo4j://localhost:7687".to_string() }

    // Environment wins over the settings file
    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("WIKIGRAPH_NEO4J_DB") { self.name = v; }
        if let Ok(v) = std::env::var("WIKIGRAPH_NEO4J_URI") { self.uri = v; }
        if let Ok(v) = std::env::var("WIKIGRAPH_NEO4J_USER") { self.user = v; }
        if let Ok(v) = std::env::var("WIKIGRAPH_NEO4J_PASSWORD") { self.password = v; }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub database: DatabaseSettings,
    // Page the first render expands
    #[serde(default = "AppSettings::default_initial_title")]
    pub initial_title: String,
    #[serde(default = "AppSettings::default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "AppSettings::default_links_per_selected_node")]
    pub links_per_selected_node: usize,
    #[serde(default = "AppSettings::default_max_path_hops")]
    pub max_path_hops: usize,
    // Viewport widths below this use the compact (mobile) layout
    #[serde(default = "AppSettings::default_compact_breakpoint")]
    pub compact_breakpoint: f32,
    #[serde(default = "AppSettings::default_compact_menu_anchor")]
    pub compact_menu_anchor: Point,
    // Upper bound on in-flight article lookups
    #[serde(default = "AppSettings::default_summary_concurrency")]
    pub summary_concurrency: usize,
    #[serde(default = "AppSettings::default_wikipedia_endpoint")]
    pub wikipedia_endpoint: String,
    // If None, use OS temporary directory for canvas exports
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    // If None, query logs go to OS temp dir
    #[serde(default)]
    pub query_log_override: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            initial_title: Self::default_initial_title(),
            similarity_threshold: Self::default_similarity_threshold(),
            links_per_selected_node: Self::default_links_per_selected_node(),
            max_path_hops: Self::default_max_path_hops(),
            compact_breakpoint: Self::default_compact_breakpoint(),
            compact_menu_anchor: Self::default_compact_menu_anchor(),
            summary_concurrency: Self::default_summary_concurrency(),
            wikipedia_endpoint: Self::default_wikipedia_endpoint(),
            export_override: None,
            query_log_override: None,
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/WikiGraph
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("WikiGraph");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\WikiGraph
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("WikiGraph");
            }
            return PathBuf::from("WikiGraph");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/WikiGraph or ~/.config/WikiGraph
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("WikiGraph");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("WikiGraph");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_dir().join("settings.json");
        let mut settings = if path.exists() { Self::load_from(&path)? } else { Self::default() };
        settings.database.apply_env();
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut f = std::fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        self.save_to(&dir.join("settings.json"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let s = serde_json::to_string_pretty(self)?;
        let mut f = std::fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Return the directory where the settings file (settings.json) is stored.
    /// This is OS-specific and resolves to a per-user configuration directory.
    pub fn settings_dir() -> PathBuf {
        Self::config_dir()
    }

    fn default_initial_title() -> String { "Universe".to_string() }
    fn default_similarity_threshold() -> f64 { 0.65 }
    fn default_links_per_selected_node() -> usize { 10 }
    fn default_max_path_hops() -> usize { 15 }
    fn default_compact_breakpoint() -> f32 { 1100.0 }
    fn default_compact_menu_anchor() -> Point { Point::new(16.0, 16.0) }
    fn default_summary_concurrency() -> usize { 4 }
    fn default_wikipedia_endpoint() -> String { "https://en.wikipedia.org/w/api.php".to_string() }

    /// Default export directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/WikiGraph/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("WikiGraph");
        p.push("exports");
        p
    }

    /// Effective export directory honoring user override or falling back to OS temp.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub fn query_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("WikiGraph");
        p.push("query-logs");
        p
    }

    pub fn query_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.query_log_override { return p.clone(); }
        Self::query_log_default_dir()
    }
}
