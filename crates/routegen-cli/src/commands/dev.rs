// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Dev command: keeps route types of every feature package in sync.

use crate::context::Workspace;
use console::style;
use routegen::watch::{WatchBackend, WatchContext, WatchCoordinator};
use routegen::{resolve_feature_packages, NotifyBackend};
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

/// Watches the feature packages of the current application until Ctrl+C.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;

    let Some(coordinator) = start(&ws, &cwd, NotifyBackend::default()).await? else {
        return Ok(());
    };

    if !quiet {
        let watched: Vec<&str> = coordinator.watched().collect();
        println!(
            "{} {}",
            style("Watching:").cyan(),
            if watched.is_empty() {
                style("no feature packages".to_string()).dim()
            } else {
                style(watched.join(", ")).green()
            }
        );
        println!("{}", style("Press Ctrl+C to stop...").dim());
    }

    let interrupted = signal::ctrl_c().await;

    if !quiet {
        println!("\nStopping watchers...");
    }
    coordinator.shutdown().await;

    interrupted?;
    Ok(())
}

/// Sets up a watch session per feature package of the package at `cwd`.
///
/// Returns `None` when the workspace graph is unavailable. Packages whose
/// watcher cannot be set up are logged and left out.
pub async fn start<B: WatchBackend>(
    ws: &Workspace,
    cwd: &Path,
    backend: B,
) -> anyhow::Result<Option<WatchCoordinator<B>>> {
    let Some(graph) = ws.graph().await else {
        tracing::warn!("Workspace graph unavailable, route types will not be watched");
        return Ok(None);
    };

    let features = resolve_feature_packages(&graph, &ws.root, Some(cwd), &ws.convention)?;
    let ctx = WatchContext {
        backend: Arc::new(backend),
        runner: Arc::new(ws.runner()),
        graph,
        cache_root: ws.cache_root(),
        debounce: ws.config.typegen.debounce(),
        extensions: ws.config.typegen.extensions.clone(),
    };

    let mut coordinator = WatchCoordinator::new(ctx);
    coordinator.watch_all(&features).await;
    Ok(Some(coordinator))
}
