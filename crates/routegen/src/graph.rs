// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Workspace dependency graph access.
//!
//! The graph itself is produced by an external provider (the monorepo tool).
//! This module models its JSON form, wraps the provider behind
//! [`GraphProvider`], and memoizes the first graph obtained in a
//! [`GraphAccessor`] that the orchestrator owns and passes around explicitly.
//!
//! # Lookup Order
//!
//! 1. Fast path: read the previously materialized graph file
//! 2. Slow path: reset the provider daemon and rebuild, tolerating partial failures
//! 3. Neither worked: no graph, feature discovery is unavailable

use crate::config::GraphConfig;
use crate::error::{GraphError, GraphResult};
use crate::shell;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A workspace project graph.
///
/// Nodes are keyed by package id. Dependency targets that are not nodes
/// (external `npm:` packages) are kept but never reported as workspace
/// dependencies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceGraph {
    /// Workspace projects by package id.
    pub nodes: HashMap<String, ProjectNode>,
    /// Outgoing dependency edges by source package id.
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<DependencyEdge>>,
}

/// A workspace project.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectNode {
    /// Package id.
    #[serde(default)]
    pub name: String,
    /// Project data; only the root is used here.
    pub data: ProjectData,
}

/// Project data carried by a node.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectData {
    /// Project root relative to the workspace root.
    pub root: String,
}

/// A directed dependency edge.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyEdge {
    /// Depending package id.
    #[serde(default)]
    pub source: String,
    /// Package id depended upon.
    pub target: String,
}

/// The cached graph is stored bare, `graph --file` output wraps it.
#[derive(Deserialize)]
#[serde(untagged)]
enum GraphFile {
    Wrapped { graph: WorkspaceGraph },
    Bare(WorkspaceGraph),
}

impl WorkspaceGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a graph from JSON, accepting both the cached and the wrapped form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str(json)? {
            GraphFile::Wrapped { graph } => Ok(graph),
            GraphFile::Bare(graph) => Ok(graph),
        }
    }

    /// Reads and parses a graph file.
    pub fn from_file(path: &Path) -> GraphResult<Self> {
        if !path.is_file() {
            return Err(GraphError::CacheMiss(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_json(&content).map_err(|source| GraphError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Adds a project node.
    pub fn add_project(&mut self, id: &str, root: &str) -> &mut Self {
        self.nodes.insert(
            id.to_string(),
            ProjectNode {
                name: id.to_string(),
                data: ProjectData {
                    root: root.to_string(),
                },
            },
        );
        self
    }

    /// Adds a dependency edge from `source` to `target`.
    pub fn add_dependency(&mut self, source: &str, target: &str) -> &mut Self {
        self.dependencies
            .entry(source.to_string())
            .or_default()
            .push(DependencyEdge {
                source: source.to_string(),
                target: target.to_string(),
            });
        self
    }

    /// Returns the root of a project relative to the workspace root.
    pub fn root_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|node| node.data.root.as_str())
    }

    /// Returns the absolute root of a project.
    pub fn resolve_root(&self, workspace_root: &Path, id: &str) -> Option<PathBuf> {
        self.root_of(id).map(|root| workspace_root.join(root))
    }

    /// Returns every workspace project reachable from `id`, excluding `id`.
    ///
    /// Depth-first, in dependency declaration order. Each project appears once.
    pub fn closure_of(&self, id: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        seen.insert(id.to_string());
        let mut closure = Vec::new();
        self.visit(id, &mut seen, &mut closure);
        closure
    }

    fn visit(&self, id: &str, seen: &mut HashSet<String>, closure: &mut Vec<String>) {
        let Some(edges) = self.dependencies.get(id) else {
            return;
        };
        for edge in edges {
            if !self.nodes.contains_key(&edge.target) || !seen.insert(edge.target.clone()) {
                continue;
            }
            closure.push(edge.target.clone());
            self.visit(&edge.target, seen, closure);
        }
    }

    /// Finds the project owning `relative_path` (relative to the workspace root).
    ///
    /// The deepest project root containing the path wins. A project rooted at
    /// `.` owns everything no other project claims.
    pub fn find_project_for_path(&self, relative_path: &Path) -> Option<&str> {
        let mappings: HashMap<String, &str> = self
            .nodes
            .iter()
            .map(|(id, node)| (normalize_root(&node.data.root), id.as_str()))
            .collect();

        let mut segments: Vec<String> = Vec::new();
        for component in relative_path.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_string_lossy().to_string()),
                Component::ParentDir => return None,
                _ => {}
            }
        }

        loop {
            if let Some(id) = mappings.get(&segments.join("/")) {
                return Some(*id);
            }
            if segments.pop().is_none() {
                return None;
            }
        }
    }
}

fn normalize_root(root: &str) -> String {
    let root = root.trim_start_matches("./").trim_end_matches('/');
    if root == "." {
        String::new()
    } else {
        root.replace('\\', "/")
    }
}

/// Options for a full graph rebuild.
#[derive(Debug, Clone, Copy)]
pub struct RebuildOptions {
    /// Fail when a preparatory step (the daemon reset) fails.
    pub exit_on_error: bool,
    /// Reset the long-lived provider daemon first.
    pub reset_daemon: bool,
}

/// External provider of the workspace graph.
pub trait GraphProvider: Send + Sync {
    /// Reads a previously materialized graph.
    fn read_cached(&self) -> GraphResult<WorkspaceGraph>;

    /// Rebuilds the graph from scratch.
    fn rebuild(
        &self,
        options: RebuildOptions,
    ) -> impl Future<Output = GraphResult<WorkspaceGraph>> + Send;
}

/// Graph provider backed by the monorepo tool's command line.
///
/// The fast path reads `cached_path`; a rebuild runs `rebuild_command` (after
/// `reset_command` when requested) and reads `rebuilt_path`.
#[derive(Debug, Clone)]
pub struct CommandGraphProvider {
    workspace_root: PathBuf,
    config: GraphConfig,
}

impl CommandGraphProvider {
    /// Creates a provider for the workspace at `workspace_root`.
    pub fn new(workspace_root: PathBuf, config: GraphConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    async fn run(&self, script: &str) -> GraphResult<()> {
        let status = shell::command(script, &self.workspace_root).status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(GraphError::RebuildFailed {
                command: script.to_string(),
                code: status.code(),
            })
        }
    }
}

impl GraphProvider for CommandGraphProvider {
    fn read_cached(&self) -> GraphResult<WorkspaceGraph> {
        WorkspaceGraph::from_file(&self.workspace_root.join(&self.config.cached_path))
    }

    async fn rebuild(&self, options: RebuildOptions) -> GraphResult<WorkspaceGraph> {
        if options.reset_daemon {
            if let Err(e) = self.run(&self.config.reset_command).await {
                if options.exit_on_error {
                    return Err(e);
                }
                tracing::warn!("Daemon reset failed, rebuilding anyway: {}", e);
            }
        }

        self.run(&self.config.rebuild_command).await?;
        WorkspaceGraph::from_file(&self.workspace_root.join(&self.config.rebuilt_path))
    }
}

/// Lazily obtained, memoized workspace graph.
///
/// The first successful lookup is kept for the lifetime of the accessor and
/// never invalidated. A failed lookup is not memoized, so a later call tries
/// again.
pub struct GraphAccessor<P> {
    provider: P,
    graph: OnceCell<Arc<WorkspaceGraph>>,
}

impl<P: GraphProvider> GraphAccessor<P> {
    /// Creates an accessor that has not touched the provider yet.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            graph: OnceCell::new(),
        }
    }

    /// Creates an accessor around an already built graph.
    pub fn with_graph(provider: P, graph: WorkspaceGraph) -> Self {
        Self {
            provider,
            graph: OnceCell::new_with(Some(Arc::new(graph))),
        }
    }

    /// Returns the graph, or `None` when neither the cache nor a rebuild produced one.
    pub async fn get_graph(&self) -> Option<Arc<WorkspaceGraph>> {
        self.graph
            .get_or_try_init(|| self.load())
            .await
            .ok()
            .cloned()
    }

    /// Like [`get_graph`](Self::get_graph), but treats a missing graph as an error.
    pub async fn require_graph(&self) -> GraphResult<Arc<WorkspaceGraph>> {
        self.get_graph().await.ok_or(GraphError::Unavailable)
    }

    async fn load(&self) -> GraphResult<Arc<WorkspaceGraph>> {
        match self.provider.read_cached() {
            Ok(graph) => return Ok(Arc::new(graph)),
            Err(e) => tracing::debug!("Cached project graph unavailable: {}", e),
        }

        let options = RebuildOptions {
            exit_on_error: false,
            reset_daemon: true,
        };
        match self.provider.rebuild(options).await {
            Ok(graph) => Ok(Arc::new(graph)),
            Err(e) => {
                tracing::warn!("Project graph rebuild failed: {}", e);
                Err(GraphError::Unavailable)
            }
        }
    }
}
