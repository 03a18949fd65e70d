// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! routegen configuration.
//!
//! Configuration is loaded from `routegen.toml` at the workspace root. Every
//! field has a default, so the file is optional.
//!
//! # Example Configuration
//!
//! ```toml
//! [workspace]
//! feature_marker = "feature-"
//! routes_dir = "src/routes"
//!
//! [graph]
//! cached_path = ".nx/workspace-data/project-graph.json"
//!
//! [typegen]
//! command = "npx react-router typegen"
//! debounce_ms = 1000
//!
//! [manifest]
//! app_dir = "app"
//! normalize = true
//! ```

use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up at the workspace root.
pub const CONFIG_FILE: &str = "routegen.toml";

/// Main configuration structure loaded from `routegen.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Workspace layout conventions.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Workspace graph provider settings.
    #[serde(default)]
    pub graph: GraphConfig,
    /// Typegen command settings.
    #[serde(default)]
    pub typegen: TypegenConfig,
    /// Route manifest settings.
    #[serde(default)]
    pub manifest: ManifestConfig,
    /// Settings for the batched `typegen-watch` task.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Workspace layout conventions.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceConfig {
    /// File whose presence marks the workspace root (default: "nx.json").
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Substring that marks a package as a feature package (default: "feature-").
    #[serde(default = "default_feature_marker")]
    pub feature_marker: String,

    /// Route directory relative to a package root (default: "src/routes").
    #[serde(default = "default_routes_dir")]
    pub routes_dir: String,

    /// Snapshot cache root relative to the workspace root (default: "node_modules/.cache").
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

/// Workspace graph provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Previously materialized graph, read on the fast path.
    #[serde(default = "default_cached_path")]
    pub cached_path: String,

    /// Command that writes a fresh graph to `rebuilt_path`.
    #[serde(default = "default_rebuild_command")]
    pub rebuild_command: String,

    /// Where `rebuild_command` writes its output.
    #[serde(default = "default_rebuilt_path")]
    pub rebuilt_path: String,

    /// Command that resets the graph daemon before a rebuild.
    #[serde(default = "default_reset_command")]
    pub reset_command: String,
}

/// Typegen command settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TypegenConfig {
    /// Type-generation command, run through the shell in the package root.
    #[serde(default = "default_typegen_command")]
    pub command: String,

    /// Generated types directory relative to the package root (default: ".react-router").
    #[serde(default = "default_types_dir")]
    pub types_dir: String,

    /// Debounce delay for watch-triggered runs in milliseconds (default: 1000).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Source extensions whose creation or deletion triggers a run.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Route manifest settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestConfig {
    /// Application directory relative to the application package (default: "app").
    #[serde(default = "default_app_dir")]
    pub app_dir: String,

    /// Route directory relative to the application directory (default: "routes").
    #[serde(default = "default_app_routes_dir")]
    pub routes_dir: String,

    /// Rewrite ids and keys to canonical `routes/...` form.
    #[serde(default)]
    pub normalize: bool,
}

/// Settings for the batched `typegen-watch` task.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Command run once per changed project. `{app}` is replaced with the
    /// id of the watching application.
    #[serde(default = "default_watch_command")]
    pub command: String,

    /// Environment variable carrying the changed project id.
    #[serde(default = "default_project_env")]
    pub project_env: String,

    /// Environment variable carrying the space-joined changed files.
    #[serde(default = "default_files_env")]
    pub files_env: String,
}

fn default_marker() -> String {
    "nx.json".to_string()
}

fn default_feature_marker() -> String {
    "feature-".to_string()
}

fn default_routes_dir() -> String {
    "src/routes".to_string()
}

fn default_cache_dir() -> String {
    "node_modules/.cache".to_string()
}

fn default_cached_path() -> String {
    ".nx/workspace-data/project-graph.json".to_string()
}

fn default_rebuild_command() -> String {
    "npx nx graph --file=.nx/workspace-data/routegen-graph.json".to_string()
}

fn default_rebuilt_path() -> String {
    ".nx/workspace-data/routegen-graph.json".to_string()
}

fn default_reset_command() -> String {
    "npx nx reset --only-daemon".to_string()
}

fn default_typegen_command() -> String {
    "npx react-router typegen".to_string()
}

fn default_types_dir() -> String {
    ".react-router".to_string()
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_extensions() -> Vec<String> {
    vec!["ts".to_string(), "tsx".to_string()]
}

fn default_app_dir() -> String {
    "app".to_string()
}

fn default_app_routes_dir() -> String {
    "routes".to_string()
}

fn default_watch_command() -> String {
    "npx nx run $NX_PROJECT_NAME:typegen --exclude={app}".to_string()
}

fn default_project_env() -> String {
    "NX_PROJECT_NAME".to_string()
}

fn default_files_env() -> String {
    "NX_FILE_CHANGES".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            feature_marker: default_feature_marker(),
            routes_dir: default_routes_dir(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cached_path: default_cached_path(),
            rebuild_command: default_rebuild_command(),
            rebuilt_path: default_rebuilt_path(),
            reset_command: default_reset_command(),
        }
    }
}

impl Default for TypegenConfig {
    fn default() -> Self {
        Self {
            command: default_typegen_command(),
            types_dir: default_types_dir(),
            debounce_ms: default_debounce_ms(),
            extensions: default_extensions(),
        }
    }
}

impl TypegenConfig {
    /// Debounce delay as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            app_dir: default_app_dir(),
            routes_dir: default_app_routes_dir(),
            normalize: false,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            command: default_watch_command(),
            project_env: default_project_env(),
            files_env: default_files_env(),
        }
    }
}

impl Config {
    /// Loads `routegen.toml` from `workspace_root`.
    ///
    /// If no configuration file exists, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(workspace_root: &Path) -> ConfigResult<Self> {
        let config_path = workspace_root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path,
            source,
        })
    }
}

/// Walks up from `start` to the first directory containing `marker`.
///
/// Falls back to `start` itself when no ancestor carries the marker.
pub fn find_workspace_root(start: &Path, marker: &str) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(marker).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.workspace.feature_marker, "feature-");
        assert_eq!(config.workspace.routes_dir, "src/routes");
        assert_eq!(config.typegen.debounce(), Duration::from_millis(1000));
        assert_eq!(config.typegen.extensions, vec!["ts", "tsx"]);
        assert!(!config.manifest.normalize);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[typegen]\ncommand = \"echo hi\"\ndebounce_ms = 250\n\n[manifest]\nnormalize = true\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.typegen.command, "echo hi");
        assert_eq!(config.typegen.debounce_ms, 250);
        assert_eq!(config.typegen.types_dir, ".react-router");
        assert!(config.manifest.normalize);
        assert_eq!(config.manifest.app_dir, "app");
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[typegen]\ndebounce_ms = \"soon\"\n").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_find_workspace_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("nx.json"), "{}").unwrap();
        let nested = dir.path().join("apps/my-app/app");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_workspace_root(&nested, "nx.json"), dir.path());

        let bare = tempdir().unwrap();
        assert_eq!(find_workspace_root(bare.path(), "nx.json"), bare.path());
    }
}
