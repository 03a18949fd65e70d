// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Manifest command: prints the merged route manifest of an application.

use crate::context::Workspace;
use routegen::features::find_package_for_dir;
use routegen::{merge_routes, resolve_feature_packages, MergeOptions, RouteManifest};
use std::path::{Path, PathBuf};

/// Prints the manifest of the application in the current directory as JSON.
pub async fn run(normalize: bool) -> anyhow::Result<()> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;

    let manifest = build(&ws, &cwd, normalize).await?;
    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}

/// Merges the application's own routes with those of its feature packages.
///
/// Normalization applies when requested here or in `[manifest]`.
pub async fn build(ws: &Workspace, cwd: &Path, normalize: bool) -> anyhow::Result<RouteManifest> {
    let graph = ws
        .graph()
        .await
        .ok_or_else(|| anyhow::anyhow!(routegen::error::GraphError::Unavailable))?;

    let app_id = find_package_for_dir(&graph, &ws.root, cwd)?;
    let app_root = graph
        .resolve_root(&ws.root, &app_id)
        .ok_or_else(|| anyhow::anyhow!("no root for package {}", app_id))?;
    let app_dir = app_root.join(&ws.config.manifest.app_dir);
    let app_routes_dir = app_dir.join(&ws.config.manifest.routes_dir);

    let feature_dirs: Vec<PathBuf> =
        resolve_feature_packages(&graph, &ws.root, Some(cwd), &ws.convention)?
            .into_iter()
            .map(|f| f.route_directory)
            .collect();

    let options = MergeOptions {
        normalize: normalize || ws.config.manifest.normalize,
    };
    Ok(merge_routes(&app_dir, &app_routes_dir, &feature_dirs, options)?)
}
