// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! # routegen
//!
//! Feature-package route discovery and route typegen orchestration for
//! monorepos.
//!
//! Applications pull routes from "feature" packages they depend on. routegen
//! finds those packages through the workspace dependency graph, merges their
//! route directories into one manifest, and keeps generated route types in
//! sync while you edit.
//!
//! ## Features
//!
//! - Memoized access to the workspace project graph, with a rebuild fallback
//! - Feature package discovery by naming convention and route directory
//! - Flat-file route discovery and manifest merging, with path repair and
//!   optional `routes/...` normalization
//! - Typegen runs with scaffold setup and guaranteed cleanup
//! - Debounced, non-overlapping regeneration per package
//! - Watch sessions that replay changes missed while offline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routegen::{CommandGraphProvider, Config, GraphAccessor, FeatureConvention, TypegenRunner};
//!
//! let config = Config::load(&workspace_root)?;
//! let graphs = GraphAccessor::new(CommandGraphProvider::new(workspace_root.clone(), config.graph.clone()));
//! let graph = graphs.require_graph().await?;
//!
//! let convention = FeatureConvention::from(&config.workspace);
//! let features = routegen::resolve_feature_packages(&graph, &workspace_root, None, &convention)?;
//!
//! let runner = TypegenRunner::new(workspace_root, &config.typegen, &convention.routes_dir);
//! let report = runner.run_all(&features, &graph).await;
//! ```

/// `routegen.toml` configuration.
pub mod config;
/// Error types.
pub mod error;
/// Feature package resolution.
pub mod features;
/// Workspace project graph access.
pub mod graph;
/// Route manifest merging.
pub mod manifest;
/// Flat-file route discovery.
pub mod routes;
/// Debounced run scheduling.
pub mod scheduler;
/// Shell command helper.
pub mod shell;
/// Directory snapshots.
pub mod snapshot;
/// Typegen runner.
pub mod typegen;
/// Watch sessions.
pub mod watch;

pub use config::{find_workspace_root, Config};
pub use error::{Error, Result};
pub use features::{resolve_feature_packages, FeatureConvention, FeaturePackage};
pub use graph::{CommandGraphProvider, GraphAccessor, GraphProvider, WorkspaceGraph};
pub use manifest::{merge_routes, MergeOptions, RouteManifest, RouteManifestEntry};
pub use scheduler::{make_trigger, DebouncedScheduler, Trigger};
pub use typegen::{BatchReport, TypegenRunner};
pub use watch::{NotifyBackend, WatchBackend, WatchContext, WatchCoordinator};
