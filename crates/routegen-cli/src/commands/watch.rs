// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Typegen-watch command: batched typegen for the dependencies of an application.
//!
//! Every dependency root of the application is watched. Route file creations
//! and deletions are attributed to their owning project and queued; the
//! queue runs the `[watch]` command once per changed project.

use crate::batch::{BatchCommandRunner, BatchQueue};
use crate::context::Workspace;
use console::style;
use routegen::routes::{normalize_path, path_to_slash};
use routegen::snapshot::FsEvent;
use routegen::watch::{is_relevant, Subscription, WatchBackend};
use routegen::{NotifyBackend, WorkspaceGraph};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

/// Decides which events concern which project.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    workspace_root: PathBuf,
    graph: Arc<WorkspaceGraph>,
    routes_dir: PathBuf,
    extensions: Vec<String>,
}

impl ChangeFilter {
    /// Creates a filter for route directories at `routes_dir` below each project root.
    pub fn new(
        workspace_root: PathBuf,
        graph: Arc<WorkspaceGraph>,
        routes_dir: &str,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            workspace_root,
            graph,
            routes_dir: normalize_path(Path::new(routes_dir)),
            extensions,
        }
    }

    /// Owning project and workspace-relative file of a relevant event.
    ///
    /// Only creations and deletions of source files below the owning
    /// project's route directory are relevant.
    pub fn classify(&self, event: &FsEvent) -> Option<(String, String)> {
        if !is_relevant(event, &self.extensions) {
            return None;
        }
        let relative = event.path.strip_prefix(&self.workspace_root).ok()?;
        let project = self.graph.find_project_for_path(relative)?;

        let project_root = normalize_path(Path::new(self.graph.root_of(project)?));
        let within_project = relative.strip_prefix(&project_root).ok()?;
        if !within_project.parent()?.starts_with(&self.routes_dir) {
            return None;
        }

        Some((project.to_string(), path_to_slash(relative)))
    }
}

/// Absolute roots of every workspace project `app` depends on.
pub fn dependency_roots(graph: &WorkspaceGraph, workspace_root: &Path, app: &str) -> Vec<PathBuf> {
    graph
        .closure_of(app)
        .iter()
        .filter_map(|id| graph.resolve_root(workspace_root, id))
        .filter(|root| root.is_dir())
        .collect()
}

/// Watches the dependencies of `project` (default: the current package) until Ctrl+C.
pub async fn run(project: Option<String>, quiet: bool) -> anyhow::Result<()> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;
    let graph = ws
        .graph()
        .await
        .ok_or_else(|| anyhow::anyhow!(routegen::error::GraphError::Unavailable))?;
    let app = ws.project_or_current(&graph, project, &cwd)?;

    let filter = ChangeFilter::new(
        ws.root.clone(),
        graph.clone(),
        &ws.convention.routes_dir,
        ws.config.typegen.extensions.clone(),
    );

    let runner = BatchCommandRunner::new(ws.root.clone(), &ws.config.watch, &app, quiet);
    let queue = BatchQueue::new(runner, ws.config.typegen.debounce());
    let backend = NotifyBackend::default();

    let mut subscriptions: Vec<Box<dyn Subscription>> = Vec::new();
    for root in dependency_roots(&graph, &ws.root, &app) {
        let filter = filter.clone();
        let recorder = queue.recorder();
        let subscribed = backend.subscribe(
            &root,
            Box::new(move |result| match result {
                Ok(events) => {
                    for (project, file) in events.iter().filter_map(|e| filter.classify(e)) {
                        tracing::debug!("{} changed in {}", file, project);
                        recorder.record(&project, &file);
                    }
                }
                Err(e) => tracing::error!("Watch error: {}", e),
            }),
        );
        match subscribed {
            Ok(subscription) => subscriptions.push(subscription),
            Err(e) => tracing::error!("Cannot watch {}: {}", root.display(), e),
        }
    }

    if !quiet {
        println!(
            "{} {} dependency root(s) of {}",
            style("Watching:").cyan(),
            subscriptions.len(),
            style(&app).green()
        );
        println!("{}", style("Press Ctrl+C to stop...").dim());
    }

    let interrupted = signal::ctrl_c().await;

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    queue.shutdown().await;

    interrupted?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use routegen::snapshot::FsEventKind;

    fn filter() -> ChangeFilter {
        let mut graph = WorkspaceGraph::new();
        graph
            .add_project("my-app", "apps/my-app")
            .add_project("feature-accounts", "packages/feature-accounts")
            .add_dependency("my-app", "feature-accounts");
        ChangeFilter::new(
            PathBuf::from("/ws"),
            Arc::new(graph),
            "src/routes",
            vec!["ts".to_string(), "tsx".to_string()],
        )
    }

    #[test]
    fn test_classifies_route_file_creation() {
        let event = FsEvent::new(
            FsEventKind::Create,
            "/ws/packages/feature-accounts/src/routes/accounts.tsx",
        );
        assert_eq!(
            filter().classify(&event),
            Some((
                "feature-accounts".to_string(),
                "packages/feature-accounts/src/routes/accounts.tsx".to_string()
            ))
        );
    }

    #[test]
    fn test_ignores_irrelevant_events() {
        let filter = filter();
        let outside_routes = FsEvent::new(FsEventKind::Create, "/ws/packages/feature-accounts/src/lib.ts");
        let edit = FsEvent::new(
            FsEventKind::Update,
            "/ws/packages/feature-accounts/src/routes/accounts.tsx",
        );
        let unowned = FsEvent::new(FsEventKind::Delete, "/ws/tools/routes/x.ts");
        let outside_workspace = FsEvent::new(FsEventKind::Create, "/elsewhere/routes/x.ts");

        assert_eq!(filter.classify(&outside_routes), None);
        assert_eq!(filter.classify(&edit), None);
        assert_eq!(filter.classify(&unowned), None);
        assert_eq!(filter.classify(&outside_workspace), None);
    }

    #[test]
    fn test_requires_full_route_directory() {
        let filter = filter();
        let app_routes = FsEvent::new(FsEventKind::Create, "/ws/packages/feature-accounts/app/routes/x.tsx");
        let nested_routes = FsEvent::new(
            FsEventKind::Create,
            "/ws/packages/feature-accounts/lib/src/routes/x.tsx",
        );
        let nested_file = FsEvent::new(
            FsEventKind::Delete,
            "/ws/packages/feature-accounts/src/routes/accounts/route.tsx",
        );

        assert_eq!(filter.classify(&app_routes), None);
        assert_eq!(filter.classify(&nested_routes), None);
        assert_eq!(
            filter.classify(&nested_file).map(|(project, _)| project),
            Some("feature-accounts".to_string())
        );
    }

    #[test]
    fn test_dependency_roots_skip_missing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("packages/feature-accounts")).unwrap();
        let mut graph = WorkspaceGraph::new();
        graph
            .add_project("my-app", "apps/my-app")
            .add_project("feature-accounts", "packages/feature-accounts")
            .add_project("feature-gone", "packages/feature-gone")
            .add_dependency("my-app", "feature-accounts")
            .add_dependency("my-app", "feature-gone");

        assert_eq!(
            dependency_roots(&graph, dir.path(), "my-app"),
            vec![dir.path().join("packages/feature-accounts")]
        );
    }
}
