// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Typegen command: one-shot route typegen for a single feature package.

use crate::context::Workspace;
use console::style;
use routegen::features::feature_package;
use std::path::Path;
use std::time::Instant;

/// Runs typegen for `project`, or the package containing the current directory.
pub async fn run(project: Option<String>, quiet: bool) -> anyhow::Result<TypegenOutcome> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;
    execute(&ws, &cwd, project, quiet).await
}

/// Outcome of [`execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypegenOutcome {
    /// Types were generated.
    Generated(String),
    /// The package was skipped, with the reason.
    Skipped(String),
}

/// Runs typegen for one package.
///
/// Packages that are not feature packages or have no route directory are
/// skipped with a warning.
///
/// # Errors
///
/// Fails when the graph is unavailable, the package cannot be determined
/// or the typegen run fails.
pub async fn execute(
    ws: &Workspace,
    cwd: &Path,
    project: Option<String>,
    quiet: bool,
) -> anyhow::Result<TypegenOutcome> {
    let graph = ws
        .graph()
        .await
        .ok_or_else(|| anyhow::anyhow!(routegen::error::GraphError::Unavailable))?;
    let package_id = ws.project_or_current(&graph, project, cwd)?;

    if !ws.convention.is_feature(&package_id) {
        tracing::warn!("{} is not a feature package, skipping typegen", package_id);
        return Ok(TypegenOutcome::Skipped(package_id));
    }

    let Some(package) = feature_package(&graph, &ws.root, &package_id, &ws.convention)? else {
        tracing::warn!("{} has no {} directory, skipping typegen", package_id, ws.convention.routes_dir);
        return Ok(TypegenOutcome::Skipped(package_id));
    };

    let start = Instant::now();
    ws.runner().run(&package.package_id, &graph).await?;

    if !quiet {
        println!(
            "  {:<32} {} {}",
            style(&package.package_id).cyan(),
            style("✓").green(),
            style(format!("{}ms", start.elapsed().as_millis())).dim()
        );
    }

    Ok(TypegenOutcome::Generated(package.package_id))
}
