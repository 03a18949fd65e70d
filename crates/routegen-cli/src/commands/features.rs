// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Features command: lists the feature packages of an application.

use crate::context::Workspace;
use console::style;
use routegen::{resolve_feature_packages, FeaturePackage};
use std::path::Path;

/// Prints the feature packages of the application in the current directory.
pub async fn run() -> anyhow::Result<()> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;

    let features = collect(&ws, &cwd).await?;
    if features.is_empty() {
        println!("{}", style("No feature packages with routes found").dim());
    }
    for feature in features {
        let dir = feature
            .route_directory
            .strip_prefix(&ws.root)
            .unwrap_or(&feature.route_directory);
        println!("{:<32} {}", style(&feature.package_id).cyan(), style(dir.display()).dim());
    }
    Ok(())
}

/// Feature packages of the package at `cwd`, sorted by id.
pub async fn collect(ws: &Workspace, cwd: &Path) -> anyhow::Result<Vec<FeaturePackage>> {
    let graph = ws
        .graph()
        .await
        .ok_or_else(|| anyhow::anyhow!(routegen::error::GraphError::Unavailable))?;

    let mut features = resolve_feature_packages(&graph, &ws.root, Some(cwd), &ws.convention)?;
    features.sort_by(|a, b| a.package_id.cmp(&b.package_id));
    Ok(features)
}
