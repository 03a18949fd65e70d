// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Workspace context shared by every command.

use routegen::features::find_package_for_dir;
use routegen::{
    find_workspace_root, CommandGraphProvider, Config, FeatureConvention, GraphAccessor,
    TypegenRunner, WorkspaceGraph,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A workspace root with its configuration and graph handle.
///
/// Commands receive this explicitly; the graph is loaded at most once per
/// process.
pub struct Workspace {
    /// Absolute workspace root.
    pub root: PathBuf,
    /// Loaded `routegen.toml`, or defaults.
    pub config: Config,
    /// Feature naming and layout conventions.
    pub convention: FeatureConvention,
    graphs: GraphAccessor<CommandGraphProvider>,
}

impl Workspace {
    /// Finds the workspace containing the current directory.
    pub fn discover() -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        // The marker is configurable, so look with the default first and
        // reload from the root that was found
        let defaults = Config::default();
        let root = find_workspace_root(&cwd, &defaults.workspace.marker);
        let config = Config::load(&root)?;
        let root = if config.workspace.marker != defaults.workspace.marker {
            find_workspace_root(&cwd, &config.workspace.marker)
        } else {
            root
        };
        Self::at(root)
    }

    /// Opens the workspace rooted at `root`.
    pub fn at(root: PathBuf) -> anyhow::Result<Self> {
        let config = Config::load(&root)?;
        let convention = FeatureConvention::from(&config.workspace);
        let provider = CommandGraphProvider::new(root.clone(), config.graph.clone());

        Ok(Self {
            root,
            config,
            convention,
            graphs: GraphAccessor::new(provider),
        })
    }

    /// The workspace graph, or `None` when it cannot be obtained.
    pub async fn graph(&self) -> Option<Arc<WorkspaceGraph>> {
        self.graphs.get_graph().await
    }

    /// Directory holding per-package snapshots.
    pub fn cache_root(&self) -> PathBuf {
        self.root.join(&self.config.workspace.cache_dir).join("routegen")
    }

    /// A typegen runner configured for this workspace.
    pub fn runner(&self) -> TypegenRunner {
        TypegenRunner::new(self.root.clone(), &self.config.typegen, &self.convention.routes_dir)
    }

    /// Resolves `project`, or the package containing `cwd` when absent.
    pub fn project_or_current(
        &self,
        graph: &WorkspaceGraph,
        project: Option<String>,
        cwd: &Path,
    ) -> anyhow::Result<String> {
        match project {
            Some(id) => Ok(id),
            None => Ok(find_package_for_dir(graph, &self.root, cwd)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cache_root_follows_config() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("routegen.toml"),
            "[workspace]\ncache_dir = \".cache\"\n",
        )
        .unwrap();

        let ws = Workspace::at(dir.path().to_path_buf()).unwrap();
        assert_eq!(ws.cache_root(), dir.path().join(".cache/routegen"));
    }

    #[test]
    fn test_explicit_project_wins() {
        let dir = tempdir().unwrap();
        let ws = Workspace::at(dir.path().to_path_buf()).unwrap();
        let graph = WorkspaceGraph::new();

        let id = ws
            .project_or_current(&graph, Some("feature-x".to_string()), dir.path())
            .unwrap();
        assert_eq!(id, "feature-x");
        assert!(ws.project_or_current(&graph, None, dir.path()).is_err());
    }
}
