// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Build command: route typegen for every feature package of an application.

use crate::context::Workspace;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use routegen::resolve_feature_packages;
use std::path::Path;
use std::time::{Duration, Instant};

/// Runs the build command for the application in the current directory.
pub async fn run(quiet: bool) -> anyhow::Result<()> {
    let ws = Workspace::discover()?;
    let cwd = std::env::current_dir()?;
    execute(&ws, &cwd, quiet).await
}

/// Runs typegen for every feature package the package at `cwd` depends on.
///
/// All packages run concurrently. A missing workspace graph makes this a
/// no-op; any failed package fails the command after the others finished.
pub async fn execute(ws: &Workspace, cwd: &Path, quiet: bool) -> anyhow::Result<()> {
    let Some(graph) = ws.graph().await else {
        tracing::warn!("Workspace graph unavailable, skipping route typegen");
        return Ok(());
    };

    let features = resolve_feature_packages(&graph, &ws.root, Some(cwd), &ws.convention)?;
    if features.is_empty() {
        if !quiet {
            println!("{}", style("No feature packages with routes found").dim());
        }
        return Ok(());
    }

    let start = Instant::now();
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("  {spinner:.cyan} typegen {msg}")?);
        pb.set_message(format!("{} feature package(s)", features.len()));
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    };

    let report = ws.runner().run_all(&features, &graph).await;
    pb.finish_and_clear();

    if !quiet {
        for package in &report.succeeded {
            println!("  {:<32} {}", style(package).cyan(), style("✓").green());
        }
        for (package, err) in &report.failed {
            println!(
                "  {:<32} {} {}",
                style(package).cyan(),
                style("✗").red(),
                style(err.to_string()).red()
            );
        }
        println!(
            "{} {}/{} feature package(s) in {}ms",
            style("Typegen:").cyan(),
            report.succeeded.len(),
            features.len(),
            start.elapsed().as_millis()
        );
    }

    if !report.is_success() {
        anyhow::bail!(
            "typegen failed for {} of {} feature package(s)",
            report.failed.len(),
            features.len()
        );
    }

    Ok(())
}
